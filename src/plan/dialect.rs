use std::fmt::Debug;

use crate::plan::{LockMode, LockOptions, LockTimeout};

/// The database-specific knowledge native query execution needs.
pub trait Dialect: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Largest number of elements in an `IN` list; 0 when unbounded.
    fn in_expression_count_limit(&self) -> usize {
        0
    }

    /// Whether `for update wait <seconds>` is understood.
    fn supports_wait_timeout(&self) -> bool {
        false
    }

    fn for_update_string(&self, lock_options: &LockOptions) -> String {
        let clause = match lock_options.lock_mode {
            LockMode::PessimisticWrite | LockMode::PessimisticForceIncrement => " for update",
            LockMode::PessimisticRead => " for share",
            _ => return String::new(),
        };
        let wait = match lock_options.timeout {
            LockTimeout::NoWait => " nowait".to_string(),
            LockTimeout::SkipLocked => " skip locked".to_string(),
            LockTimeout::Wait => String::new(),
            LockTimeout::Millis(millis) if self.supports_wait_timeout() => {
                // whole seconds, rounded up
                format!(" wait {}", millis.div_ceil(1000))
            }
            LockTimeout::Millis(millis) => {
                tracing::debug!(
                    dialect = self.name(),
                    millis,
                    "dialect has no lock timeout syntax; waiting indefinitely"
                );
                String::new()
            }
        };
        format!("{}{}", clause, wait)
    }

    /// Appends the lock clause for pessimistic lock modes.
    fn apply_locks(&self, sql: &str, lock_options: &LockOptions) -> String {
        if !lock_options.lock_mode.is_pessimistic() {
            return sql.to_string();
        }
        let trimmed = sql.trim_end().trim_end_matches(';');
        format!("{}{}", trimmed, self.for_update_string(lock_options))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericDialect {
    name: String,
    in_expression_count_limit: usize,
    wait_timeout: bool,
}

impl GenericDialect {
    pub fn new() -> Self {
        Self {
            name: "GenericDialect".to_string(),
            in_expression_count_limit: 0,
            wait_timeout: false,
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            in_expression_count_limit: 0,
            wait_timeout: false,
        }
    }

    pub fn with_in_expression_count_limit(mut self, limit: usize) -> Self {
        self.in_expression_count_limit = limit;
        self
    }

    pub fn with_wait_timeout(mut self) -> Self {
        self.wait_timeout = true;
        self
    }
}

impl Default for GenericDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for GenericDialect {
    fn name(&self) -> &str {
        &self.name
    }

    fn in_expression_count_limit(&self) -> usize {
        self.in_expression_count_limit
    }

    fn supports_wait_timeout(&self) -> bool {
        self.wait_timeout
    }
}
