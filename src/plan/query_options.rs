use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::FlushMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    Read,
    Optimistic,
    PessimisticRead,
    PessimisticWrite,
    PessimisticForceIncrement,
}

impl LockMode {
    pub fn is_pessimistic(&self) -> bool {
        matches!(
            self,
            LockMode::PessimisticRead | LockMode::PessimisticWrite | LockMode::PessimisticForceIncrement
        )
    }
}

/// How long a pessimistic lock request waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockTimeout {
    #[default]
    Wait,
    NoWait,
    SkipLocked,
    Millis(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOptions {
    pub lock_mode: LockMode,
    pub timeout: LockTimeout,
}

impl LockOptions {
    pub fn new(lock_mode: LockMode) -> Self {
        Self {
            lock_mode,
            timeout: LockTimeout::Wait,
        }
    }

    pub fn with_timeout(mut self, timeout: LockTimeout) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Row window applied by the execution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Limit {
    pub first_row: Option<usize>,
    pub max_rows: Option<usize>,
}

impl Limit {
    pub fn is_empty(&self) -> bool {
        self.first_row.is_none() && self.max_rows.is_none()
    }
}

/// Per-execution options collected by a query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryOptions {
    pub limit: Limit,
    /// Statement timeout in seconds.
    pub timeout: Option<u32>,
    pub fetch_size: Option<u32>,
    pub flush_mode: Option<FlushMode>,
    pub lock_options: LockOptions,
    pub cacheable: bool,
    pub cache_region: Option<String>,
    pub read_only: Option<bool>,
    pub comment: Option<String>,
    pub hints: IndexMap<String, String>,
}

impl QueryOptions {
    /// `Some(0)` means the query can return nothing.
    pub fn effective_max_rows(&self) -> Option<usize> {
        self.limit.max_rows
    }

    pub fn has_limit(&self) -> bool {
        !self.limit.is_empty()
    }
}
