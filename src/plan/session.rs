use crate::config::FlushMode;
use crate::Result;

/// The unit of work a query runs in, provided by the embedding application.
pub trait SharedSession: Send + Sync {
    fn is_transaction_in_progress(&self) -> bool;

    fn flush_mode(&self) -> FlushMode;

    fn flush(&self) -> Result<()>;

    /// Flushes pending changes that touch any of `query_spaces`. Returns
    /// whether anything was flushed.
    fn auto_flush_if_required(&self, query_spaces: &[String]) -> Result<bool>;

    /// Invalidates cached state for `affected_tables` once a bulk statement ran.
    fn register_bulk_operation_cleanup(&self, affected_tables: &[String]);
}
