pub mod named_query;
pub use named_query::*;

pub mod query_engine;
pub use query_engine::*;

pub mod native_query;
pub use native_query::*;
