use std::sync::Arc;

use crate::config::Settings;
use crate::criteria::{CriteriaBuilder, CriteriaQuery, RenderedQuery, SqlRenderer};
use crate::metamodel::MappingMetamodel;
use crate::native::{NamedQueryRegistry, NamedQueryRepository, NativeQuery, ResultSetMappingDefinition};
use crate::parameter::{ParameterInterpretationCache, ParameterMarkerStrategy, StandardMarkerStrategy};
use crate::plan::{Dialect, JdbcExecutor, PlanEnvironment, QueryPlanCache, SharedSession};
use crate::{QueryError, Result};

/// Process-wide owner of the caches and metadata native queries are built from.
///
/// One engine is shared by every session; queries borrow it for their lifetime.
#[derive(Debug)]
pub struct QueryEngine {
    settings: Settings,
    dialect: Arc<dyn Dialect>,
    metamodel: Arc<dyn MappingMetamodel>,
    marker_strategy: Arc<dyn ParameterMarkerStrategy>,
    interpretation_cache: ParameterInterpretationCache,
    plan_cache: QueryPlanCache,
    named_queries: Arc<dyn NamedQueryRepository>,
    registry: Option<Arc<NamedQueryRegistry>>,
}

impl QueryEngine {
    pub fn new(settings: Settings, dialect: Arc<dyn Dialect>, metamodel: Arc<dyn MappingMetamodel>) -> Self {
        let marker_strategy: Arc<dyn ParameterMarkerStrategy> = Arc::new(StandardMarkerStrategy);
        let registry = Arc::new(NamedQueryRegistry::new());
        Self {
            interpretation_cache: ParameterInterpretationCache::new(
                marker_strategy.clone(),
                settings.jdbc_start_position,
                settings.parameter_interpretation_cache_enabled,
            ),
            plan_cache: QueryPlanCache::new(settings.query_plan_cache_enabled),
            named_queries: registry.clone(),
            registry: Some(registry),
            settings,
            dialect,
            metamodel,
            marker_strategy,
        }
    }

    /// Swaps the marker strategy; cached interpretations are discarded.
    pub fn with_marker_strategy(mut self, marker_strategy: Arc<dyn ParameterMarkerStrategy>) -> Self {
        self.interpretation_cache = ParameterInterpretationCache::new(
            marker_strategy.clone(),
            self.settings.jdbc_start_position,
            self.settings.parameter_interpretation_cache_enabled,
        );
        self.plan_cache.clear();
        self.marker_strategy = marker_strategy;
        self
    }

    /// Uses an external repository; `register_*` calls are then rejected.
    pub fn with_named_queries(mut self, named_queries: Arc<dyn NamedQueryRepository>) -> Self {
        self.named_queries = named_queries;
        self.registry = None;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn metamodel(&self) -> &dyn MappingMetamodel {
        self.metamodel.as_ref()
    }

    pub fn marker_strategy(&self) -> &Arc<dyn ParameterMarkerStrategy> {
        &self.marker_strategy
    }

    pub fn interpretation_cache(&self) -> &ParameterInterpretationCache {
        &self.interpretation_cache
    }

    pub fn plan_cache(&self) -> &QueryPlanCache {
        &self.plan_cache
    }

    pub fn named_queries(&self) -> &dyn NamedQueryRepository {
        self.named_queries.as_ref()
    }

    fn registry(&self) -> Result<&NamedQueryRegistry> {
        self.registry.as_deref().ok_or_else(|| {
            QueryError::unsupported("Named queries are provided by an external repository and cannot be registered")
        })
    }

    pub fn register_named_query(&self, memento: crate::native::NamedNativeQueryMemento) -> Result<()> {
        self.registry()?.register(memento)
    }

    pub fn register_result_set_mapping(&self, definition: ResultSetMappingDefinition) -> Result<()> {
        self.registry()?.register_result_set_mapping(definition)
    }

    pub fn load_named_queries(&self, file_path: impl AsRef<std::path::Path>) -> Result<usize> {
        self.registry()?.load_from_file(file_path)
    }

    pub fn plan_environment(&self) -> PlanEnvironment {
        PlanEnvironment {
            dialect: self.dialect.clone(),
            marker_strategy: self.marker_strategy.clone(),
            padding_enabled: self.settings.in_clause_parameter_padding,
            start_position: self.settings.jdbc_start_position,
            use_sql_comments: self.settings.use_sql_comments,
        }
    }

    pub fn create_native_query<'a>(
        &'a self,
        sql: &str,
        session: &'a dyn SharedSession,
        jdbc: &'a dyn JdbcExecutor,
    ) -> Result<NativeQuery<'a>> {
        NativeQuery::new(self, sql, session, jdbc)
    }

    pub fn create_named_native_query<'a>(
        &'a self,
        name: &str,
        session: &'a dyn SharedSession,
        jdbc: &'a dyn JdbcExecutor,
    ) -> Result<NativeQuery<'a>> {
        let memento = self
            .named_queries
            .get_native_query_memento(name)
            .ok_or_else(|| QueryError::mapping(format!("No named native query registered as [{}]", name)))?;
        NativeQuery::from_memento(self, &memento, session, jdbc)
    }

    pub fn criteria_builder(&self) -> CriteriaBuilder<'_> {
        CriteriaBuilder::with_metamodel(self.metamodel.as_ref())
    }

    /// Renders with the engine's marker strategy, start position and mappings.
    pub fn render_criteria(&self, query: &CriteriaQuery) -> Result<RenderedQuery> {
        SqlRenderer::new(self.marker_strategy.as_ref(), self.settings.jdbc_start_position)
            .with_metamodel(self.metamodel.as_ref())
            .render(query)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::_fixtures::fixtures::{metamodel, RecordingJdbc, RecordingSession};
    use crate::config::Settings;
    use crate::criteria::{CriteriaQuery, QuerySpec, Selection};
    use crate::native::{NamedNativeQueryMemento, NamedQueryRegistry, QueryEngine};
    use crate::parameter::OrdinalMarkerStrategy;
    use crate::plan::GenericDialect;
    use crate::QueryError;

    fn engine() -> QueryEngine {
        QueryEngine::new(Settings::new(), Arc::new(GenericDialect::new()), Arc::new(metamodel()))
    }

    #[test]
    pub fn test_plan_environment_follows_settings() {
        let engine = QueryEngine::new(
            Settings::new().with_padding(true).with_sql_comments(true),
            Arc::new(GenericDialect::named("oracle").with_in_expression_count_limit(1000)),
            Arc::new(metamodel()),
        );

        let environment = engine.plan_environment();

        assert!(environment.padding_enabled);
        assert!(environment.use_sql_comments);
        assert_eq!(environment.start_position, 1);
        assert_eq!(environment.dialect.in_expression_count_limit(), 1000);
    }

    #[test]
    pub fn test_create_native_query_interprets_parameters() {
        let engine = engine();
        let session = RecordingSession::default();
        let jdbc = RecordingJdbc::default();

        let query = engine
            .create_native_query("select * from person where name = :name", &session, &jdbc)
            .unwrap();

        assert_eq!(query.parameter_interpretation().parameter_count(), 1);
        assert_eq!(engine.interpretation_cache().len(), 1);
    }

    #[test]
    pub fn test_marker_strategy_is_used_for_adjusted_sql() {
        let engine = engine().with_marker_strategy(Arc::new(OrdinalMarkerStrategy::default()));
        let session = RecordingSession::default();
        let jdbc = RecordingJdbc::default();

        let query = engine
            .create_native_query("select * from person where id = :id and name = :name", &session, &jdbc)
            .unwrap();

        assert_eq!(
            query.parameter_interpretation().adjusted_sql(),
            "select * from person where id = $1 and name = $2"
        );
    }

    #[test]
    pub fn test_unknown_named_query() {
        let engine = engine();
        let session = RecordingSession::default();
        let jdbc = RecordingJdbc::default();

        let result = engine.create_named_native_query("missing", &session, &jdbc);

        assert!(matches!(result, Err(QueryError::Mapping(_))));
    }

    #[test]
    pub fn test_external_repository_rejects_registration() {
        let engine = engine().with_named_queries(Arc::new(NamedQueryRegistry::new()));

        let result = engine.register_named_query(NamedNativeQueryMemento::new("q", "select 1"));

        assert!(matches!(result, Err(QueryError::UnsupportedOperation(_))));
    }

    #[test]
    pub fn test_load_named_queries_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"[{ "name": "people", "sql": "select * from person" }]"#).unwrap();
        let engine = engine();
        let session = RecordingSession::default();
        let jdbc = RecordingJdbc::default();

        assert_eq!(engine.load_named_queries(file.path()).unwrap(), 1);
        let query = engine.create_named_native_query("people", &session, &jdbc).unwrap();

        assert_eq!(query.sql(), "select * from person");
    }

    #[test]
    pub fn test_render_criteria_uses_engine_strategy() {
        let engine = engine().with_marker_strategy(Arc::new(OrdinalMarkerStrategy::default()));
        let cb = engine.criteria_builder();
        let p = cb.root_as("Person", "p").unwrap();
        let spec = QuerySpec::new()
            .select(Selection::new(p.path("name")))
            .from(p.clone())
            .restrict(cb.equal(p.path("id"), cb.parameter("id")));

        let rendered = engine.render_criteria(&CriteriaQuery::new(spec)).unwrap();

        assert_eq!(rendered.sql, "select p.name from person p where p.id = $1");
        assert_eq!(rendered.start_position, 1);
    }
}
