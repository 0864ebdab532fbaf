use std::collections::BTreeSet;

use indexmap::IndexSet;

use crate::parameter::{
    ParameterMarkerStrategy, ParameterOccurrence, ParameterRecognizer, ParameterStyle, QueryParameter,
};
use crate::parser::{ParseError, ParseErrorKind};

/// Builds the adjusted SQL for a native query: every parameter marker is
/// replaced by the JDBC marker and its occurrence recorded.
pub struct NativeParameterRecognizer<'a> {
    sql: &'a str,
    marker_strategy: &'a dyn ParameterMarkerStrategy,
    start_position: usize,
    adjusted: String,
    occurrences: Vec<ParameterOccurrence>,
    parameters: IndexSet<QueryParameter>,
    ordinal_labels: BTreeSet<u32>,
    style: Option<ParameterStyle>,
    jdbc_count: u32,
}

impl<'a> NativeParameterRecognizer<'a> {
    pub fn new(sql: &'a str, marker_strategy: &'a dyn ParameterMarkerStrategy, start_position: usize) -> Self {
        Self {
            sql,
            marker_strategy,
            start_position,
            adjusted: String::with_capacity(sql.len()),
            occurrences: Vec::new(),
            parameters: IndexSet::new(),
            ordinal_labels: BTreeSet::new(),
            style: None,
            jdbc_count: 0,
        }
    }

    pub fn style(&self) -> Option<ParameterStyle> {
        self.style
    }

    pub fn into_parts(self) -> (String, Vec<ParameterOccurrence>, IndexSet<QueryParameter>) {
        (self.adjusted, self.occurrences, self.parameters)
    }

    fn check_style(&mut self, style: ParameterStyle) -> Result<(), ParseError> {
        match self.style {
            None => {
                self.style = Some(style);
                Ok(())
            }
            Some(current) if current == style => Ok(()),
            Some(current) => ParseError::for_query(
                ParseErrorKind::MixedParameterStyles,
                format!(
                    "Cannot mix parameter styles between JDBC-style, ordinal and named in the same query (found {} after {})",
                    style, current
                ),
                self.sql,
            )
            .err(),
        }
    }

    fn push_occurrence(&mut self, parameter: QueryParameter) {
        let position = self.start_position + self.occurrences.len();
        let marker = self.marker_strategy.create_marker(position);
        let source_position = self.adjusted.len();
        self.adjusted.push_str(&marker);
        self.occurrences
            .push(ParameterOccurrence::new(parameter.clone(), source_position, marker.len()));
        self.parameters.insert(parameter);
    }
}

impl ParameterRecognizer for NativeParameterRecognizer<'_> {
    fn named_parameter(&mut self, name: &str, _source_position: usize) -> Result<(), ParseError> {
        self.check_style(ParameterStyle::Named)?;
        self.push_occurrence(QueryParameter::Named(name.to_string()));
        Ok(())
    }

    fn jpa_positional_parameter(&mut self, label: u32, _source_position: usize) -> Result<(), ParseError> {
        self.check_style(ParameterStyle::JpaOrdinal)?;
        self.ordinal_labels.insert(label);
        self.push_occurrence(QueryParameter::Ordinal(label));
        Ok(())
    }

    fn ordinal_parameter(&mut self, _source_position: usize) -> Result<(), ParseError> {
        self.check_style(ParameterStyle::Jdbc)?;
        self.jdbc_count += 1;
        self.push_occurrence(QueryParameter::Jdbc(self.jdbc_count));
        Ok(())
    }

    fn other(&mut self, c: char) {
        self.adjusted.push(c);
    }

    fn complete(&mut self) -> Result<(), ParseError> {
        let mut last: Option<u32> = None;
        for &label in &self.ordinal_labels {
            match last {
                None if label != 1 => {
                    return ParseError::for_query(
                        ParseErrorKind::OrdinalLabelNotStartingAtOne,
                        format!(
                            "Ordinal parameter labels start from '?{}' (ordinal parameters must be labelled from '?1')",
                            label
                        ),
                        self.sql,
                    )
                    .err();
                }
                Some(previous) if label != previous + 1 => {
                    return ParseError::for_query(
                        ParseErrorKind::OrdinalLabelGap,
                        format!(
                            "Gap between '?{}' and '?{}' in ordinal parameter labels (ordinal parameters must be labelled sequentially)",
                            previous, label
                        ),
                        self.sql,
                    )
                    .err();
                }
                _ => {}
            }
            last = Some(label);
        }
        Ok(())
    }
}
