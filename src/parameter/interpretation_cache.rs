use std::sync::Arc;

use dashmap::DashMap;

use crate::parameter::{ParameterInterpretation, ParameterMarkerStrategy};
use crate::parser::ParseError;

/// Interpretations keyed by SQL text, shared across sessions.
///
/// Concurrent misses on the same key may both compute; the first insert wins
/// and later callers get the stored value.
#[derive(Debug)]
pub struct ParameterInterpretationCache {
    entries: DashMap<String, Arc<ParameterInterpretation>>,
    marker_strategy: Arc<dyn ParameterMarkerStrategy>,
    start_position: usize,
    enabled: bool,
}

impl ParameterInterpretationCache {
    pub fn new(marker_strategy: Arc<dyn ParameterMarkerStrategy>, start_position: usize, enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            marker_strategy,
            start_position,
            enabled,
        }
    }

    pub fn resolve(&self, sql: &str) -> Result<Arc<ParameterInterpretation>, ParseError> {
        if !self.enabled {
            return self.interpret(sql).map(Arc::new);
        }

        if let Some(found) = self.entries.get(sql) {
            tracing::debug!(sql, "parameter interpretation cache hit");
            return Ok(found.value().clone());
        }

        tracing::debug!(sql, "parameter interpretation cache miss");
        let computed = Arc::new(self.interpret(sql)?);
        let stored = self.entries.entry(sql.to_string()).or_insert(computed);
        Ok(stored.value().clone())
    }

    fn interpret(&self, sql: &str) -> Result<ParameterInterpretation, ParseError> {
        ParameterInterpretation::interpret(sql, self.marker_strategy.as_ref(), self.start_position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use crate::parameter::{ParameterInterpretationCache, StandardMarkerStrategy};
    use crate::parser::ParseErrorKind;

    #[test]
    pub fn test_cache_returns_same_instance() {
        let cache = ParameterInterpretationCache::new(Arc::new(StandardMarkerStrategy), 1, true);

        let first = cache.resolve("select * from t where a = :a").unwrap();
        let second = cache.resolve("select * from t where a = :a").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    pub fn test_cache_disabled() {
        let cache = ParameterInterpretationCache::new(Arc::new(StandardMarkerStrategy), 1, false);

        let first = cache.resolve("select 1").unwrap();
        let second = cache.resolve("select 1").unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(cache.is_empty());
    }

    #[test]
    pub fn test_failed_interpretation_is_not_cached() {
        let cache = ParameterInterpretationCache::new(Arc::new(StandardMarkerStrategy), 1, true);

        let err = cache.resolve("where a = ?3").unwrap_err();

        assert_eq!(err.kind, ParseErrorKind::OrdinalLabelNotStartingAtOne);
        assert!(cache.is_empty());
    }

    #[test]
    pub fn test_concurrent_resolution_converges() {
        let cache = Arc::new(ParameterInterpretationCache::new(Arc::new(StandardMarkerStrategy), 1, true));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.resolve("select * from t where id in (:ids)").unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(cache.len(), 1);
        let stored = cache.resolve("select * from t where id in (:ids)").unwrap();
        for result in results {
            assert_eq!(result.adjusted_sql(), stored.adjusted_sql());
        }
    }
}
