use std::fmt::{self, Display};

/// How a parameter was written in the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterStyle {
    /// `:name`
    Named,
    /// `?1`, `?2`, ...
    JpaOrdinal,
    /// bare `?`
    Jdbc,
}

impl Display for ParameterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterStyle::Named => write!(f, "named"),
            ParameterStyle::JpaOrdinal => write!(f, "ordinal"),
            ParameterStyle::Jdbc => write!(f, "JDBC-style"),
        }
    }
}

/// A logical parameter of a query. Repeated occurrences of the same name or
/// label resolve to equal values of this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryParameter {
    Named(String),
    /// Explicit `?N` label.
    Ordinal(u32),
    /// Implicit position assigned to a bare `?`, counted from 1.
    Jdbc(u32),
}

impl QueryParameter {
    pub fn style(&self) -> ParameterStyle {
        match self {
            QueryParameter::Named(_) => ParameterStyle::Named,
            QueryParameter::Ordinal(_) => ParameterStyle::JpaOrdinal,
            QueryParameter::Jdbc(_) => ParameterStyle::Jdbc,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            QueryParameter::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<u32> {
        match self {
            QueryParameter::Named(_) => None,
            QueryParameter::Ordinal(p) | QueryParameter::Jdbc(p) => Some(*p),
        }
    }

    /// Name for named parameters, the position rendered as text otherwise.
    pub fn label(&self) -> String {
        match self {
            QueryParameter::Named(name) => name.clone(),
            QueryParameter::Ordinal(p) | QueryParameter::Jdbc(p) => p.to_string(),
        }
    }
}

impl Display for QueryParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryParameter::Named(name) => write!(f, ":{}", name),
            QueryParameter::Ordinal(p) => write!(f, "?{}", p),
            QueryParameter::Jdbc(p) => write!(f, "?[{}]", p),
        }
    }
}
