pub mod sql_cursor;
pub use sql_cursor::*;

pub mod parse_error;
pub use parse_error::*;
