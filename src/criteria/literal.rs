use std::fmt::{self, Display};

use ordered_float::NotNan;

use crate::{QueryError, Result};

/// A constant written inline into the rendered SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(NotNan<f64>),
    String(String),
}

impl Literal {
    /// NaN and infinities have no SQL literal form.
    pub fn float(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(QueryError::criteria(format!("{} cannot be rendered as a SQL literal", value)));
        }
        NotNan::new(value)
            .map(Literal::Float)
            .map_err(|_| QueryError::criteria("NaN cannot be rendered as a SQL literal"))
    }

    pub fn is_renderable(&self) -> bool {
        match self {
            Literal::Float(n) => n.is_finite(),
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(n) => write!(f, "{:?}", n.into_inner()),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value as i64)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::criteria::Literal;
    use crate::QueryError;

    #[test]
    pub fn test_literal_rendering() {
        assert_eq!(Literal::Null.to_string(), "null");
        assert_eq!(Literal::from(true).to_string(), "true");
        assert_eq!(Literal::from(42).to_string(), "42");
        assert_eq!(Literal::float(1.5).unwrap().to_string(), "1.5");
        assert_eq!(Literal::float(2.0).unwrap().to_string(), "2.0");
        assert_eq!(Literal::from("O'Brien").to_string(), "'O''Brien'");
    }

    #[test]
    pub fn test_non_finite_floats_are_rejected() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(Literal::float(value), Err(QueryError::Criteria(_))));
        }
        assert!(!Literal::Float(ordered_float::NotNan::new(f64::INFINITY).unwrap()).is_renderable());
        assert!(Literal::from(1).is_renderable());
    }

    #[test]
    pub fn test_nan_is_not_a_literal() {
        assert!(Literal::float(f64::NAN).is_err());
    }
}
