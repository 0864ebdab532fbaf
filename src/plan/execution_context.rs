use std::sync::Arc;

use crate::parameter::{
    InListExpander, JdbcParameterBindings, ParameterMarkerStrategy, ParameterOccurrence, QueryParameterBindings,
};
use crate::plan::{Dialect, JdbcExecutor, QueryOptions, SharedSession};
use crate::Result;

/// Everything one execution of a plan needs from its caller.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub session: &'a dyn SharedSession,
    pub jdbc: &'a dyn JdbcExecutor,
    pub options: &'a QueryOptions,
    pub bindings: &'a QueryParameterBindings,
}

/// Engine-wide settings a plan renders and binds with.
#[derive(Debug, Clone)]
pub struct PlanEnvironment {
    pub dialect: Arc<dyn Dialect>,
    pub marker_strategy: Arc<dyn ParameterMarkerStrategy>,
    pub padding_enabled: bool,
    pub start_position: usize,
    pub use_sql_comments: bool,
}

impl PlanEnvironment {
    pub fn expander(&self) -> InListExpander<'_> {
        InListExpander {
            padding_enabled: self.padding_enabled,
            in_expression_limit: self.dialect.in_expression_count_limit(),
            dialect_name: self.dialect.name(),
            marker_strategy: self.marker_strategy.as_ref(),
            start_position: self.start_position,
        }
    }

    pub fn jdbc_bindings(
        &self,
        occurrences: &[ParameterOccurrence],
        bindings: &QueryParameterBindings,
    ) -> Result<JdbcParameterBindings> {
        if occurrences.is_empty() {
            return Ok(JdbcParameterBindings::none());
        }
        self.expander().bind(occurrences, bindings)
    }

    pub fn with_comment(&self, sql: String, options: &QueryOptions) -> String {
        match &options.comment {
            Some(comment) if self.use_sql_comments => format!("/* {} */ {}", comment.replace("*/", "* /"), sql),
            _ => sql,
        }
    }
}
