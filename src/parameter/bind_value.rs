use std::fmt::{self, Display};

use chrono::{NaiveDate, NaiveDateTime};
use ordered_float::NotNan;
use serde_json::Value;
use uuid::Uuid;

use crate::{QueryError, Result};

/// A value bound to a parameter or read back from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(NotNan<f64>),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    Json(Value),
}

impl BindValue {
    pub fn is_null(&self) -> bool {
        matches!(self, BindValue::Null)
    }

    /// NaN has no SQL counterpart and is refused.
    pub fn float(value: f64) -> Result<Self> {
        NotNan::new(value)
            .map(BindValue::Float)
            .map_err(|_| QueryError::binding("NaN cannot be bound as a parameter value"))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            BindValue::Null => "null",
            BindValue::Bool(_) => "boolean",
            BindValue::Int(_) => "integer",
            BindValue::Float(_) => "float",
            BindValue::String(_) => "string",
            BindValue::Bytes(_) => "bytes",
            BindValue::Date(_) => "date",
            BindValue::Timestamp(_) => "timestamp",
            BindValue::Uuid(_) => "uuid",
            BindValue::Json(_) => "json",
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => BindValue::Int(i),
                None => n
                    .as_f64()
                    .and_then(|f| BindValue::float(f).ok())
                    .unwrap_or(BindValue::Null),
            },
            Value::String(s) => BindValue::String(s.clone()),
            other => BindValue::Json(other.clone()),
        }
    }
}

impl Display for BindValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindValue::Null => write!(f, "null"),
            BindValue::Bool(b) => write!(f, "{}", b),
            BindValue::Int(i) => write!(f, "{}", i),
            BindValue::Float(n) => write!(f, "{}", n.into_inner()),
            BindValue::String(s) => write!(f, "'{}'", s),
            BindValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            BindValue::Date(d) => write!(f, "{}", d),
            BindValue::Timestamp(t) => write!(f, "{}", t),
            BindValue::Uuid(u) => write!(f, "{}", u),
            BindValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        BindValue::Bool(value)
    }
}

impl From<i32> for BindValue {
    fn from(value: i32) -> Self {
        BindValue::Int(value as i64)
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        BindValue::Int(value)
    }
}

impl TryFrom<f64> for BindValue {
    type Error = QueryError;

    fn try_from(value: f64) -> Result<Self> {
        BindValue::float(value)
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        BindValue::String(value.to_string())
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        BindValue::String(value)
    }
}

impl From<Vec<u8>> for BindValue {
    fn from(value: Vec<u8>) -> Self {
        BindValue::Bytes(value)
    }
}

impl From<NaiveDate> for BindValue {
    fn from(value: NaiveDate) -> Self {
        BindValue::Date(value)
    }
}

impl From<NaiveDateTime> for BindValue {
    fn from(value: NaiveDateTime) -> Self {
        BindValue::Timestamp(value)
    }
}

impl From<Uuid> for BindValue {
    fn from(value: Uuid) -> Self {
        BindValue::Uuid(value)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(BindValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parameter::BindValue;
    use crate::QueryError;

    #[test]
    pub fn test_from_json() {
        assert_eq!(BindValue::from_json(&json!(null)), BindValue::Null);
        assert_eq!(BindValue::from_json(&json!(42)), BindValue::Int(42));
        assert_eq!(BindValue::from_json(&json!(1.5)), BindValue::float(1.5).unwrap());
        assert_eq!(BindValue::from_json(&json!("x")), BindValue::String("x".into()));
        assert_eq!(BindValue::from_json(&json!([1, 2])), BindValue::Json(json!([1, 2])));
    }

    #[test]
    pub fn test_nan_is_refused() {
        assert!(matches!(BindValue::float(f64::NAN), Err(QueryError::ParameterBinding(_))));
        assert!(matches!(BindValue::try_from(f64::NAN), Err(QueryError::ParameterBinding(_))));
        assert_eq!(BindValue::try_from(0.25).unwrap().to_string(), "0.25");
    }

    #[test]
    pub fn test_optional_values() {
        assert_eq!(BindValue::from(None::<i64>), BindValue::Null);
        assert_eq!(BindValue::from(Some(3)), BindValue::Int(3));
    }
}
