use indexmap::IndexSet;

use crate::parameter::{
    parse, NativeParameterRecognizer, ParameterMarkerStrategy, ParameterOccurrence, ParameterStyle,
    QueryParameter,
};
use crate::parser::ParseError;

/// Result of recognizing the parameters of one SQL string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInterpretation {
    original_sql: String,
    adjusted_sql: String,
    occurrences: Vec<ParameterOccurrence>,
    parameters: IndexSet<QueryParameter>,
    style: Option<ParameterStyle>,
}

impl ParameterInterpretation {
    pub fn interpret(
        sql: &str,
        marker_strategy: &dyn ParameterMarkerStrategy,
        start_position: usize,
    ) -> Result<Self, ParseError> {
        let mut recognizer = NativeParameterRecognizer::new(sql, marker_strategy, start_position);
        parse(sql, &mut recognizer, false)?;

        let style = recognizer.style();
        let (adjusted_sql, occurrences, parameters) = recognizer.into_parts();
        tracing::trace!(
            parameters = parameters.len(),
            occurrences = occurrences.len(),
            "recognized native query parameters"
        );

        Ok(Self {
            original_sql: sql.to_string(),
            adjusted_sql,
            occurrences,
            parameters,
            style,
        })
    }

    pub fn original_sql(&self) -> &str {
        &self.original_sql
    }

    pub fn adjusted_sql(&self) -> &str {
        &self.adjusted_sql
    }

    pub fn occurrences(&self) -> &[ParameterOccurrence] {
        &self.occurrences
    }

    /// Distinct parameters in order of first appearance.
    pub fn parameters(&self) -> impl Iterator<Item = &QueryParameter> {
        self.parameters.iter()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn style(&self) -> Option<ParameterStyle> {
        self.style
    }

    pub fn contains(&self, parameter: &QueryParameter) -> bool {
        self.parameters.contains(parameter)
    }

    pub fn find_named(&self, name: &str) -> Option<&QueryParameter> {
        self.parameters.iter().find(|p| p.name() == Some(name))
    }

    /// Matches an explicit `?N` label or the N-th bare `?`.
    pub fn find_positional(&self, position: u32) -> Option<&QueryParameter> {
        self.parameters.iter().find(|p| p.position() == Some(position))
    }
}

#[cfg(test)]
mod tests {
    use crate::parameter::{ParameterInterpretation, QueryParameter, StandardMarkerStrategy};

    #[test]
    pub fn test_interpret_named() {
        let interpretation = ParameterInterpretation::interpret(
            "select * from person p where p.name = :name and p.age > :age or p.alias = :name",
            &StandardMarkerStrategy,
            1,
        )
        .unwrap();

        assert_eq!(
            interpretation.adjusted_sql(),
            "select * from person p where p.name = ? and p.age > ? or p.alias = ?"
        );
        assert_eq!(interpretation.occurrences().len(), 3);
        assert_eq!(interpretation.parameter_count(), 2);
        assert_eq!(interpretation.find_named("age"), Some(&QueryParameter::Named("age".into())));
        assert_eq!(interpretation.find_named("missing"), None);
        assert_eq!(interpretation.find_positional(1), None);
    }

    #[test]
    pub fn test_interpret_without_parameters() {
        let sql = "select count(*) from person";
        let interpretation = ParameterInterpretation::interpret(sql, &StandardMarkerStrategy, 1).unwrap();

        assert!(!interpretation.has_parameters());
        assert_eq!(interpretation.adjusted_sql(), sql);
        assert_eq!(interpretation.style(), None);
    }

    #[test]
    pub fn test_find_positional_for_both_styles() {
        let jpa = ParameterInterpretation::interpret("where a = ?1", &StandardMarkerStrategy, 1).unwrap();
        let jdbc = ParameterInterpretation::interpret("where a = ?", &StandardMarkerStrategy, 1).unwrap();

        assert_eq!(jpa.find_positional(1), Some(&QueryParameter::Ordinal(1)));
        assert_eq!(jdbc.find_positional(1), Some(&QueryParameter::Jdbc(1)));
    }
}
