use crate::parameter::QueryParameter;

/// One appearance of a parameter marker in the adjusted SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterOccurrence {
    pub parameter: QueryParameter,
    /// Byte offset of the marker in the adjusted SQL.
    pub source_position: usize,
    /// Byte length of the marker text.
    pub length: usize,
}

impl ParameterOccurrence {
    pub fn new(parameter: QueryParameter, source_position: usize, length: usize) -> Self {
        Self { parameter, source_position, length }
    }

    pub fn end(&self) -> usize {
        self.source_position + self.length
    }
}
