use crate::parameter::ParameterOccurrence;
use crate::plan::{ExecutionContext, JdbcMutation, PlanEnvironment};
use crate::Result;

#[derive(Debug)]
pub struct NativeNonSelectQueryPlan {
    sql: String,
    affected_table_names: Vec<String>,
    parameter_occurrences: Vec<ParameterOccurrence>,
    environment: PlanEnvironment,
}

impl NativeNonSelectQueryPlan {
    pub fn new(
        sql: String,
        affected_table_names: Vec<String>,
        parameter_occurrences: Vec<ParameterOccurrence>,
        environment: PlanEnvironment,
    ) -> Self {
        Self {
            sql,
            affected_table_names,
            parameter_occurrences,
            environment,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn affected_table_names(&self) -> &[String] {
        &self.affected_table_names
    }

    /// Flushes pending changes to the affected tables, schedules their cache
    /// cleanup and runs the statement.
    pub fn execute_update(&self, context: &ExecutionContext<'_>) -> Result<u64> {
        let session = context.session;
        let flushed = session.auto_flush_if_required(&self.affected_table_names)?;
        tracing::debug!(flushed, tables = ?self.affected_table_names, "auto flush before native update");
        session.register_bulk_operation_cleanup(&self.affected_table_names);

        let bindings = self
            .environment
            .jdbc_bindings(&self.parameter_occurrences, context.bindings)?;
        let statement = JdbcMutation {
            sql: self.environment.with_comment(self.sql.clone(), context.options),
            bindings,
            affected_table_names: self.affected_table_names.clone(),
            timeout: context.options.timeout,
        };
        tracing::debug!(sql = %statement.sql, "executing native update");
        context.jdbc.execute_update(&statement)
    }
}
