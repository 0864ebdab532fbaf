//! Alias and placeholder substitution in native SQL.

pub mod parser_context;
pub use parser_context::*;

pub mod sql_query_parser;
pub use sql_query_parser::*;
