use crate::parameter::ParameterOccurrence;
use crate::plan::{ExecutionContext, JdbcSelect, PlanEnvironment, RowCursor};
use crate::results::{ResultType, ResultValue, RowReader};
use crate::Result;

/// Executable form of a native select, reusable across executions.
#[derive(Debug)]
pub struct NativeSelectQueryPlan {
    sql: String,
    affected_table_names: Vec<String>,
    parameter_occurrences: Vec<ParameterOccurrence>,
    reader: RowReader,
    result_type: ResultType,
    environment: PlanEnvironment,
}

impl NativeSelectQueryPlan {
    pub fn new(
        sql: String,
        affected_table_names: Vec<String>,
        parameter_occurrences: Vec<ParameterOccurrence>,
        reader: RowReader,
        result_type: ResultType,
        environment: PlanEnvironment,
    ) -> Self {
        Self {
            sql,
            affected_table_names,
            parameter_occurrences,
            reader,
            result_type,
            environment,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn affected_table_names(&self) -> &[String] {
        &self.affected_table_names
    }

    pub fn parameter_occurrences(&self) -> &[ParameterOccurrence] {
        &self.parameter_occurrences
    }

    fn statement(&self, context: &ExecutionContext<'_>) -> Result<JdbcSelect> {
        let bindings = self
            .environment
            .jdbc_bindings(&self.parameter_occurrences, context.bindings)?;
        let options = context.options;
        let sql = self.environment.dialect.apply_locks(&self.sql, &options.lock_options);

        Ok(JdbcSelect {
            sql: self.environment.with_comment(sql, options),
            bindings,
            affected_table_names: self.affected_table_names.clone(),
            limit: options.limit,
            timeout: options.timeout,
            fetch_size: options.fetch_size,
        })
    }

    fn reads_nothing(context: &ExecutionContext<'_>) -> bool {
        context.options.effective_max_rows() == Some(0)
    }

    /// Feeds every result to `consumer`; returns how many were consumed.
    pub fn execute_query(
        &self,
        context: &ExecutionContext<'_>,
        mut consumer: impl FnMut(ResultValue) -> Result<()>,
    ) -> Result<usize> {
        let mut count = 0;
        for value in self.perform_scroll(context)? {
            consumer(value?)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn perform_list(&self, context: &ExecutionContext<'_>) -> Result<Vec<ResultValue>> {
        if Self::reads_nothing(context) {
            return Ok(Vec::new());
        }
        let statement = self.statement(context)?;
        tracing::debug!(sql = %statement.sql, bindings = statement.bindings.len(), "executing native select");

        let rows = context.jdbc.select(&statement)?;
        rows.iter()
            .map(|row| self.result_type.apply(self.reader.read(row)?))
            .collect()
    }

    pub fn perform_scroll(&self, context: &ExecutionContext<'_>) -> Result<ScrollableResults> {
        if Self::reads_nothing(context) {
            return Ok(ScrollableResults::empty());
        }
        let statement = self.statement(context)?;
        tracing::debug!(sql = %statement.sql, bindings = statement.bindings.len(), "scrolling native select");

        let cursor = context.jdbc.scroll(&statement)?;
        Ok(ScrollableResults {
            cursor: Some(cursor),
            reader: self.reader.clone(),
            result_type: self.result_type.clone(),
        })
    }
}

/// Results read lazily from a row cursor.
pub struct ScrollableResults {
    cursor: Option<Box<dyn RowCursor>>,
    reader: RowReader,
    result_type: ResultType,
}

impl ScrollableResults {
    pub fn empty() -> Self {
        Self {
            cursor: None,
            reader: RowReader::dynamic(),
            result_type: ResultType::Any,
        }
    }
}

impl Iterator for ScrollableResults {
    type Item = Result<ResultValue>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        let row = match cursor.next_row() {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.cursor = None;
                return None;
            }
            Err(e) => {
                self.cursor = None;
                return Some(Err(e));
            }
        };
        Some(
            self.reader
                .read(&row)
                .and_then(|value| self.result_type.apply(value)),
        )
    }
}
