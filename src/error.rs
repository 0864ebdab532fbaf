use thiserror::Error;

use crate::parser::{ParseError, ParseErrorKind};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}")]
    AliasResolution(String),

    #[error("{0}")]
    ResultShape(String),

    #[error("{0}")]
    UnsupportedOperation(String),

    #[error("{0}")]
    Mapping(String),

    #[error("{0}")]
    ParameterBinding(String),

    #[error("{0}")]
    Criteria(String),

    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    pub fn alias(message: impl Into<String>) -> Self {
        Self::AliasResolution(message.into())
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::ResultShape(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping(message.into())
    }

    pub fn binding(message: impl Into<String>) -> Self {
        Self::ParameterBinding(message.into())
    }

    pub fn criteria(message: impl Into<String>) -> Self {
        Self::Criteria(message.into())
    }

    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            QueryError::Parse(err) => Some(err.kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
