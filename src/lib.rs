pub mod parser;

pub mod error;
pub use error::{QueryError, Result};

pub mod config;
pub use config::{FlushMode, Settings};

pub mod parameter;
pub mod metamodel;
pub mod results;
pub mod sql;
pub mod plan;

pub mod native;
pub use native::{NativeQuery, QueryEngine};

pub mod criteria;

#[cfg(test)]
mod _fixtures;
