use crate::parser::ParseError;

/// Receives the events of a parameter scan, in source order.
pub trait ParameterRecognizer {
    fn named_parameter(&mut self, name: &str, source_position: usize) -> Result<(), ParseError>;

    fn jpa_positional_parameter(&mut self, label: u32, source_position: usize) -> Result<(), ParseError>;

    /// A bare `?`.
    fn ordinal_parameter(&mut self, source_position: usize) -> Result<(), ParseError>;

    fn other(&mut self, c: char);

    fn other_str(&mut self, text: &str) {
        for c in text.chars() {
            self.other(c);
        }
    }

    fn complete(&mut self) -> Result<(), ParseError>;
}
