use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use crate::plan::{NativeNonSelectQueryPlan, NativeSelectQueryPlan};
use crate::results::ResultType;
use crate::Result;

/// Identifies a select plan: the final SQL, how its rows are mapped and
/// where JDBC parameter positions start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectInterpretationsKey {
    pub sql: String,
    pub mapping_identity: String,
    pub result_type: ResultType,
    pub start_position: usize,
    pub query_spaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonSelectInterpretationsKey {
    pub sql: String,
    pub query_spaces: Vec<String>,
}

impl NonSelectInterpretationsKey {
    pub fn new(sql: &str, query_spaces: &[String]) -> Self {
        let mut query_spaces = query_spaces.to_vec();
        query_spaces.sort();
        query_spaces.dedup();
        Self {
            sql: sql.to_string(),
            query_spaces,
        }
    }
}

/// Native query plans shared across sessions.
///
/// Like the parameter interpretation cache, racing misses may build the same
/// plan twice; the first stored plan is returned to everyone.
#[derive(Debug)]
pub struct QueryPlanCache {
    select_plans: DashMap<SelectInterpretationsKey, Arc<NativeSelectQueryPlan>>,
    non_select_plans: DashMap<NonSelectInterpretationsKey, Arc<NativeNonSelectQueryPlan>>,
    enabled: bool,
}

fn resolve<K, V>(
    enabled: bool,
    entries: &DashMap<K, Arc<V>>,
    key: K,
    creator: impl FnOnce() -> Result<V>,
) -> Result<Arc<V>>
where
    K: Eq + Hash + std::fmt::Debug,
{
    if !enabled {
        return creator().map(Arc::new);
    }
    if let Some(found) = entries.get(&key) {
        tracing::debug!(?key, "query plan cache hit");
        return Ok(found.value().clone());
    }
    tracing::debug!(?key, "query plan cache miss");
    let created = Arc::new(creator()?);
    let stored = entries.entry(key).or_insert(created);
    Ok(stored.value().clone())
}

impl QueryPlanCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            select_plans: DashMap::new(),
            non_select_plans: DashMap::new(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn resolve_select_plan(
        &self,
        key: SelectInterpretationsKey,
        creator: impl FnOnce() -> Result<NativeSelectQueryPlan>,
    ) -> Result<Arc<NativeSelectQueryPlan>> {
        resolve(self.enabled, &self.select_plans, key, creator)
    }

    pub fn resolve_non_select_plan(
        &self,
        key: NonSelectInterpretationsKey,
        creator: impl FnOnce() -> Result<NativeNonSelectQueryPlan>,
    ) -> Result<Arc<NativeNonSelectQueryPlan>> {
        resolve(self.enabled, &self.non_select_plans, key, creator)
    }

    pub fn select_plan_count(&self) -> usize {
        self.select_plans.len()
    }

    pub fn non_select_plan_count(&self) -> usize {
        self.non_select_plans.len()
    }

    pub fn clear(&self) {
        self.select_plans.clear();
        self.non_select_plans.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::parameter::StandardMarkerStrategy;
    use crate::plan::{
        GenericDialect, NativeNonSelectQueryPlan, NativeSelectQueryPlan, NonSelectInterpretationsKey, PlanEnvironment,
        QueryPlanCache, SelectInterpretationsKey,
    };
    use crate::results::{ResultType, RowReader};
    use crate::QueryError;

    fn environment() -> PlanEnvironment {
        PlanEnvironment {
            dialect: Arc::new(GenericDialect::new()),
            marker_strategy: Arc::new(StandardMarkerStrategy),
            padding_enabled: false,
            start_position: 1,
            use_sql_comments: false,
        }
    }

    fn select_key(sql: &str) -> SelectInterpretationsKey {
        SelectInterpretationsKey {
            sql: sql.to_string(),
            mapping_identity: "[]|[]".to_string(),
            result_type: ResultType::Any,
            start_position: 1,
            query_spaces: vec![],
        }
    }

    fn select_plan(sql: &str) -> NativeSelectQueryPlan {
        NativeSelectQueryPlan::new(
            sql.to_string(),
            vec![],
            vec![],
            RowReader::dynamic(),
            ResultType::Any,
            environment(),
        )
    }

    #[test]
    pub fn test_select_plans_are_shared() {
        let cache = QueryPlanCache::new(true);

        let first = cache
            .resolve_select_plan(select_key("select 1"), || Ok(select_plan("select 1")))
            .unwrap();
        let second = cache
            .resolve_select_plan(select_key("select 1"), || panic!("plan should come from the cache"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.select_plan_count(), 1);
    }

    #[test]
    pub fn test_disabled_cache_always_builds() {
        let cache = QueryPlanCache::new(false);

        let first = cache
            .resolve_select_plan(select_key("select 1"), || Ok(select_plan("select 1")))
            .unwrap();
        let second = cache
            .resolve_select_plan(select_key("select 1"), || Ok(select_plan("select 1")))
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.select_plan_count(), 0);
    }

    #[test]
    pub fn test_failed_creation_is_not_stored() {
        let cache = QueryPlanCache::new(true);

        let result = cache.resolve_select_plan(select_key("select 1"), || Err(QueryError::mapping("boom")));

        assert!(result.is_err());
        assert_eq!(cache.select_plan_count(), 0);
    }

    #[test]
    pub fn test_non_select_key_ignores_space_order() {
        let cache = QueryPlanCache::new(true);
        let spaces_a = vec!["phone".to_string(), "person".to_string()];
        let spaces_b = vec!["person".to_string(), "phone".to_string(), "phone".to_string()];

        assert_eq!(
            NonSelectInterpretationsKey::new("delete from x", &spaces_a),
            NonSelectInterpretationsKey::new("delete from x", &spaces_b)
        );

        let plan = || Ok(NativeNonSelectQueryPlan::new("delete from x".to_string(), vec![], vec![], environment()));
        cache
            .resolve_non_select_plan(NonSelectInterpretationsKey::new("delete from x", &spaces_a), plan)
            .unwrap();
        cache
            .resolve_non_select_plan(NonSelectInterpretationsKey::new("delete from x", &spaces_b), plan)
            .unwrap();

        assert_eq!(cache.non_select_plan_count(), 1);
        cache.clear();
        assert_eq!(cache.non_select_plan_count(), 0);
    }
}
