pub mod query_parameter;
pub use query_parameter::*;

pub mod occurrence;
pub use occurrence::*;

pub mod marker;
pub use marker::*;

pub mod recognizer;
pub use recognizer::*;

pub mod parameter_parser;
pub use parameter_parser::*;

pub mod native_recognizer;
pub use native_recognizer::*;

pub mod interpretation;
pub use interpretation::*;

pub mod interpretation_cache;
pub use interpretation_cache::*;

pub mod bind_value;
pub use bind_value::*;

pub mod binding;
pub use binding::*;

pub mod sql_buffer;
pub use sql_buffer::*;

pub mod list_expansion;
pub use list_expansion::*;
