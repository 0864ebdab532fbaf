use indexmap::IndexMap;

use crate::parameter::{BindValue, ParameterInterpretation, QueryParameter};
use crate::{QueryError, Result};

/// The value(s) bound to one logical parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterBinding {
    Single(BindValue),
    /// Collection value, expanded into an IN list at execution.
    Multi(Vec<BindValue>),
}

impl ParameterBinding {
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, ParameterBinding::Multi(_))
    }
}

/// Bindings of one query execution, keyed by logical parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParameterBindings {
    bindings: IndexMap<QueryParameter, ParameterBinding>,
}

impl QueryParameterBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, parameter: QueryParameter, binding: ParameterBinding) {
        self.bindings.insert(parameter, binding);
    }

    pub fn get(&self, parameter: &QueryParameter) -> Option<&ParameterBinding> {
        self.bindings.get(parameter)
    }

    pub fn is_bound(&self, parameter: &QueryParameter) -> bool {
        self.bindings.contains_key(parameter)
    }

    pub fn has_multi_valued(&self) -> bool {
        self.bindings.values().any(ParameterBinding::is_multi_valued)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Every parameter of the query must have a binding before execution.
    pub fn validate(&self, interpretation: &ParameterInterpretation) -> Result<()> {
        for parameter in interpretation.parameters() {
            if !self.is_bound(parameter) {
                return Err(QueryError::binding(format!(
                    "No value bound for parameter [{}]",
                    parameter
                )));
            }
        }
        Ok(())
    }
}

/// A value bound to one JDBC marker position.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcParameterBinding {
    pub position: usize,
    pub value: BindValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JdbcParameterBindings(pub Vec<JdbcParameterBinding>);

impl JdbcParameterBindings {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, position: usize, value: BindValue) {
        self.0.push(JdbcParameterBinding { position, value });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> Vec<&BindValue> {
        self.0.iter().map(|b| &b.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::parameter::{
        BindValue, ParameterBinding, ParameterInterpretation, QueryParameter, QueryParameterBindings,
        StandardMarkerStrategy,
    };
    use crate::QueryError;

    #[test]
    pub fn test_validate_reports_unbound() {
        let interpretation =
            ParameterInterpretation::interpret("where a = :a and b = :b", &StandardMarkerStrategy, 1).unwrap();
        let mut bindings = QueryParameterBindings::new();
        bindings.bind(QueryParameter::Named("a".into()), ParameterBinding::Single(BindValue::Int(1)));

        let err = bindings.validate(&interpretation).unwrap_err();
        assert!(matches!(err, QueryError::ParameterBinding(ref m) if m.contains(":b")));

        bindings.bind(
            QueryParameter::Named("b".into()),
            ParameterBinding::Multi(vec![BindValue::Int(1), BindValue::Int(2)]),
        );
        assert!(bindings.validate(&interpretation).is_ok());
        assert!(bindings.has_multi_valued());
    }
}
