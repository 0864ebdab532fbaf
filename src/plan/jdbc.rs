use crate::parameter::JdbcParameterBindings;
use crate::plan::Limit;
use crate::results::Row;
use crate::Result;

/// A select statement ready for the JDBC layer.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcSelect {
    pub sql: String,
    pub bindings: JdbcParameterBindings,
    pub affected_table_names: Vec<String>,
    pub limit: Limit,
    pub timeout: Option<u32>,
    pub fetch_size: Option<u32>,
}

/// An insert, update or delete ready for the JDBC layer.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcMutation {
    pub sql: String,
    pub bindings: JdbcParameterBindings,
    pub affected_table_names: Vec<String>,
    pub timeout: Option<u32>,
}

/// Forward-only row source.
pub trait RowCursor: Send {
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Cursor over rows already in memory.
#[derive(Debug)]
pub struct VecCursor(std::vec::IntoIter<Row>);

impl VecCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self(rows.into_iter())
    }
}

impl RowCursor for VecCursor {
    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.0.next())
    }
}

/// Statement execution, provided by the embedding application.
pub trait JdbcExecutor: Send + Sync {
    fn select(&self, statement: &JdbcSelect) -> Result<Vec<Row>>;

    fn scroll(&self, statement: &JdbcSelect) -> Result<Box<dyn RowCursor>> {
        Ok(Box::new(VecCursor::new(self.select(statement)?)))
    }

    /// Returns the affected row count.
    fn execute_update(&self, statement: &JdbcMutation) -> Result<u64>;
}
