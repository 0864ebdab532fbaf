use std::fmt::Display;

use crate::parser::SqlCursor;

/// Category of a recognition or rewrite failure, so callers can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    EmptyParameterName,
    MixedParameterStyles,
    OrdinalLabelNotStartingAtOne,
    OrdinalLabelGap,
    InvalidOrdinalLabel,
    UnsupportedCallEscape,
    UnterminatedEscape,
    NestedEscape,
    UnknownPlaceholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: &str, pivot: usize, cursor: &SqlCursor) -> Self {
        Self {
            kind,
            message: message.to_string(),
            text: cursor.text_from_range(pivot, cursor.position + 1),
            start: pivot,
            end: cursor.position,
        }
    }

    /// Error about the query as a whole rather than a span of it.
    pub fn for_query(kind: ParseErrorKind, message: impl Into<String>, sql: &str) -> Self {
        Self {
            kind,
            message: message.into(),
            text: sql.to_string(),
            start: 0,
            end: sql.chars().count(),
        }
    }

    pub fn err<T>(self) -> Result<T, ParseError> {
        Err(self)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ParseError: {}\n  at [{}:{}] -> '{}'",
            self.message,
            self.start,
            self.end,
            self.text
        )
    }
}

impl std::error::Error for ParseError {}
