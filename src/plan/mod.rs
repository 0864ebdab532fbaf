//! Executable native query plans and the seams to the JDBC layer and session.

pub mod query_options;
pub use query_options::*;

pub mod dialect;
pub use dialect::*;

pub mod jdbc;
pub use jdbc::*;

pub mod session;
pub use session::*;

pub mod execution_context;
pub use execution_context::*;

pub mod native_select_plan;
pub use native_select_plan::*;

pub mod native_non_select_plan;
pub use native_non_select_plan::*;

pub mod plan_cache;
pub use plan_cache::*;

