use std::sync::Arc;

use crate::config::FlushMode;
use crate::native::{split_role, NamedNativeQueryMemento, QueryEngine, ResultSetMappingDefinition};
use crate::parameter::{BindValue, ParameterBinding, ParameterInterpretation, QueryParameter, QueryParameterBindings};
use crate::plan::{
    ExecutionContext, JdbcExecutor, LockMode, LockOptions, NativeNonSelectQueryPlan, NativeSelectQueryPlan,
    NonSelectInterpretationsKey, PlanEnvironment, QueryOptions, ScrollableResults, SelectInterpretationsKey,
    SharedSession,
};
use crate::results::{
    CollectionReturn, FetchReturn, InstantiationReturn, ResultBuilder, ResultSetMapping, ResultSetMappingProcessor,
    ResultType, ResultValue, RootReturn, RowReader, ScalarReturn, ScalarType,
};
use crate::sql::{ParserContext, SqlQueryParser};
use crate::{QueryError, Result};

/// Statement timeout in seconds.
pub const HINT_TIMEOUT: &str = "orm.timeout";
/// Statement timeout in milliseconds, rounded down to seconds.
pub const HINT_JPA_TIMEOUT: &str = "jakarta.persistence.query.timeout";
pub const HINT_FETCH_SIZE: &str = "orm.fetch_size";
pub const HINT_COMMENT: &str = "orm.comment";
pub const HINT_CACHEABLE: &str = "orm.cacheable";
pub const HINT_CACHE_REGION: &str = "orm.cache_region";
pub const HINT_READ_ONLY: &str = "orm.read_only";
pub const HINT_FLUSH_MODE: &str = "orm.flush_mode";

/// A SQL query written by hand, executed through the session.
///
/// Results are described by the result-set mapping built with the `add_*`
/// methods or applied by name. Without a mapping every selected column is
/// returned.
pub struct NativeQuery<'a> {
    engine: &'a QueryEngine,
    session: &'a dyn SharedSession,
    jdbc: &'a dyn JdbcExecutor,

    sql: String,
    interpretation: Arc<ParameterInterpretation>,
    bindings: QueryParameterBindings,

    mapping: ResultSetMapping,
    mapping_from_definition: bool,
    result_type: ResultType,

    query_spaces: Vec<String>,
    options: QueryOptions,
}

impl<'a> NativeQuery<'a> {
    pub fn new(
        engine: &'a QueryEngine,
        sql: &str,
        session: &'a dyn SharedSession,
        jdbc: &'a dyn JdbcExecutor,
    ) -> Result<Self> {
        let interpretation = engine.interpretation_cache().resolve(sql)?;
        Ok(Self {
            engine,
            session,
            jdbc,
            sql: sql.to_string(),
            interpretation,
            bindings: QueryParameterBindings::new(),
            mapping: ResultSetMapping::new(),
            mapping_from_definition: false,
            result_type: ResultType::Any,
            query_spaces: Vec::new(),
            options: QueryOptions::default(),
        })
    }

    pub fn from_memento(
        engine: &'a QueryEngine,
        memento: &NamedNativeQueryMemento,
        session: &'a dyn SharedSession,
        jdbc: &'a dyn JdbcExecutor,
    ) -> Result<Self> {
        let mut query = Self::new(engine, &memento.sql, session, jdbc)?;

        for label in &memento.parameters {
            if !query.interpretation.parameters().any(|p| &p.label() == label) {
                return Err(QueryError::mapping(format!(
                    "Named native query [{}] declares parameter [{}] which does not appear in its SQL",
                    memento.name, label
                )));
            }
        }

        if let Some(mapping_name) = &memento.result_set_mapping {
            let definition = engine.named_queries().get_result_set_mapping(mapping_name).ok_or_else(|| {
                QueryError::mapping(format!(
                    "Unable to find ResultSetMappingDescriptor [{}] specified for named native query [{}]",
                    mapping_name, memento.name
                ))
            })?;
            query.apply_definition(&definition)?;
        }

        for space in &memento.query_spaces {
            query.add_synchronized_query_space(space);
        }
        query.options.cacheable = memento.cacheable;
        query.options.cache_region = memento.cache_region.clone();
        query.options.flush_mode = memento.flush_mode;
        query.options.read_only = memento.read_only;
        query.options.lock_options = memento.lock_options;
        query.options.timeout = memento.timeout;
        query.options.fetch_size = memento.fetch_size;
        query.options.comment = memento.comment.clone();
        query.options.hints = memento.hints.clone();
        Ok(query)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_interpretation(&self) -> &ParameterInterpretation {
        &self.interpretation
    }

    pub fn bindings(&self) -> &QueryParameterBindings {
        &self.bindings
    }

    pub fn result_set_mapping(&self) -> &ResultSetMapping {
        &self.mapping
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn synchronized_query_spaces(&self) -> &[String] {
        &self.query_spaces
    }

    // Result mapping

    fn check_mapping_mutable(&self) -> Result<()> {
        if self.mapping_from_definition {
            return Err(QueryError::unsupported(
                "NativeQuery already has ResultSetMapping associated with it",
            ));
        }
        Ok(())
    }

    fn add_builder(&mut self, builder: ResultBuilder) -> Result<&mut Self> {
        self.check_mapping_mutable()?;
        self.mapping.add_result_builder(builder);
        Ok(self)
    }

    pub fn add_scalar(&mut self, column_alias: &str) -> Result<&mut Self> {
        self.add_builder(ResultBuilder::Scalar(ScalarReturn::new(column_alias)))
    }

    pub fn add_scalar_typed(&mut self, column_alias: &str, scalar_type: ScalarType) -> Result<&mut Self> {
        self.add_builder(ResultBuilder::Scalar(ScalarReturn::typed(column_alias, scalar_type)))
    }

    /// Returns the entity under its unqualified name as table alias.
    pub fn add_entity(&mut self, entity_name: &str) -> Result<&mut Self> {
        let alias = entity_name.rsplit('.').next().unwrap_or(entity_name);
        self.add_root(alias, entity_name)
    }

    pub fn add_entity_alias(&mut self, table_alias: &str, entity_name: &str) -> Result<&mut Self> {
        self.add_root(table_alias, entity_name)
    }

    pub fn add_root(&mut self, table_alias: &str, entity_name: &str) -> Result<&mut Self> {
        self.add_root_return(RootReturn::new(table_alias, entity_name))
    }

    /// Adds a root carrying its own property column aliases or lock mode.
    pub fn add_root_return(&mut self, root: RootReturn) -> Result<&mut Self> {
        self.add_builder(ResultBuilder::Root(root))
    }

    /// Adds a collection returned at the top level; `role` is `Owner.property`.
    pub fn add_collection(&mut self, table_alias: &str, role: &str) -> Result<&mut Self> {
        let (owner, property) = split_role(role)?;
        self.add_builder(ResultBuilder::Collection(CollectionReturn::new(table_alias, owner, property)))
    }

    pub fn add_instantiation(&mut self, target: &str, column_aliases: &[&str]) -> Result<&mut Self> {
        self.add_builder(ResultBuilder::Instantiation(InstantiationReturn {
            target: target.to_string(),
            arguments: column_aliases.iter().map(|c| ScalarReturn::new(c)).collect(),
        }))
    }

    pub fn add_fetch(&mut self, table_alias: &str, owner_alias: &str, property: &str) -> Result<&mut Self> {
        self.add_fetch_return(FetchReturn::new(table_alias, owner_alias, property))
    }

    pub fn add_fetch_return(&mut self, fetch: FetchReturn) -> Result<&mut Self> {
        self.check_mapping_mutable()?;
        self.mapping.add_legacy_fetch(fetch);
        Ok(self)
    }

    /// Fetches `path`, written `owner_alias.property`, under `table_alias`.
    pub fn add_join(&mut self, table_alias: &str, path: &str) -> Result<&mut Self> {
        let Some((owner_alias, property)) = path.split_once('.') else {
            return Err(QueryError::mapping(format!(
                "Not a property path [{}]; should be in form [owner_alias].[fetched_attribute_name]",
                path
            )));
        };
        if property.contains('.') {
            return Err(QueryError::mapping(format!(
                "Cannot join composite property path [{}]; should be in form [owner_alias].[fetched_attribute_name]",
                path
            )));
        }
        self.add_fetch(table_alias, owner_alias, property)
    }

    /// Replaces the mapping with a registered definition.
    pub fn with_result_set_mapping(&mut self, mapping_name: &str) -> Result<&mut Self> {
        let definition = self
            .engine
            .named_queries()
            .get_result_set_mapping(mapping_name)
            .ok_or_else(|| QueryError::mapping(format!("Unknown result set mapping [{}]", mapping_name)))?;
        self.apply_definition(&definition)?;
        Ok(self)
    }

    fn apply_definition(&mut self, definition: &ResultSetMappingDefinition) -> Result<()> {
        self.mapping = definition.to_mapping()?;
        self.mapping_from_definition = true;
        Ok(())
    }

    pub fn set_result_type(&mut self, result_type: ResultType) -> &mut Self {
        self.result_type = result_type;
        self
    }

    // Parameters

    fn named_parameter(&self, name: &str) -> Result<QueryParameter> {
        self.interpretation.find_named(name).cloned().ok_or_else(|| {
            let known: Vec<String> = self.interpretation.parameters().map(QueryParameter::label).collect();
            QueryError::binding(format!(
                "Could not locate named parameter [{}], expecting one of [{}]",
                name,
                known.join(", ")
            ))
        })
    }

    fn positional_parameter(&self, position: u32) -> Result<QueryParameter> {
        self.interpretation.find_positional(position).cloned().ok_or_else(|| {
            QueryError::binding(format!(
                "Could not locate ordinal parameter [{}], expecting one of [{}]",
                position,
                self.interpretation
                    .parameters()
                    .filter_map(QueryParameter::position)
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<BindValue>) -> Result<&mut Self> {
        let parameter = self.named_parameter(name)?;
        self.bindings.bind(parameter, ParameterBinding::Single(value.into()));
        Ok(self)
    }

    pub fn set_positional(&mut self, position: u32, value: impl Into<BindValue>) -> Result<&mut Self> {
        let parameter = self.positional_parameter(position)?;
        self.bindings.bind(parameter, ParameterBinding::Single(value.into()));
        Ok(self)
    }

    /// Binds a collection, expanded into an IN list when executed.
    pub fn set_parameter_list<V: Into<BindValue>>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<&mut Self> {
        let parameter = self.named_parameter(name)?;
        let values = values.into_iter().map(Into::into).collect();
        self.bindings.bind(parameter, ParameterBinding::Multi(values));
        Ok(self)
    }

    pub fn set_positional_list<V: Into<BindValue>>(
        &mut self,
        position: u32,
        values: impl IntoIterator<Item = V>,
    ) -> Result<&mut Self> {
        let parameter = self.positional_parameter(position)?;
        let values = values.into_iter().map(Into::into).collect();
        self.bindings.bind(parameter, ParameterBinding::Multi(values));
        Ok(self)
    }

    // Options

    pub fn set_max_results(&mut self, max_results: usize) -> &mut Self {
        self.options.limit.max_rows = Some(max_results);
        self
    }

    pub fn set_first_result(&mut self, first_result: usize) -> &mut Self {
        self.options.limit.first_row = Some(first_result);
        self
    }

    /// Statement timeout in seconds.
    pub fn set_timeout(&mut self, timeout: u32) -> &mut Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn set_fetch_size(&mut self, fetch_size: u32) -> &mut Self {
        self.options.fetch_size = Some(fetch_size);
        self
    }

    pub fn set_flush_mode(&mut self, flush_mode: FlushMode) -> &mut Self {
        self.options.flush_mode = Some(flush_mode);
        self
    }

    pub fn set_cacheable(&mut self, cacheable: bool) -> &mut Self {
        self.options.cacheable = cacheable;
        self
    }

    pub fn set_cache_region(&mut self, region: &str) -> &mut Self {
        self.options.cache_region = Some(region.to_string());
        self
    }

    pub fn set_comment(&mut self, comment: &str) -> &mut Self {
        self.options.comment = Some(comment.to_string());
        self
    }

    pub fn set_read_only(&mut self, read_only: bool) -> &mut Self {
        self.options.read_only = Some(read_only);
        self
    }

    /// Pessimistic lock options, rendered by the dialect into the select.
    pub fn set_lock_options(&mut self, lock_options: LockOptions) -> &mut Self {
        self.options.lock_options = lock_options;
        self
    }

    /// Stores the hint; recognised hints also set the matching option.
    pub fn add_query_hint(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        match name {
            HINT_TIMEOUT => self.options.timeout = Some(parse_hint(name, value)?),
            HINT_JPA_TIMEOUT => self.options.timeout = Some(parse_hint::<u32>(name, value)? / 1000),
            HINT_FETCH_SIZE => self.options.fetch_size = Some(parse_hint(name, value)?),
            HINT_COMMENT => self.options.comment = Some(value.to_string()),
            HINT_CACHEABLE => self.options.cacheable = parse_hint(name, value)?,
            HINT_CACHE_REGION => self.options.cache_region = Some(value.to_string()),
            HINT_READ_ONLY => self.options.read_only = Some(parse_hint(name, value)?),
            HINT_FLUSH_MODE => self.options.flush_mode = Some(parse_flush_mode(value)?),
            _ => tracing::trace!(hint = name, "storing unrecognised query hint"),
        }
        self.options.hints.insert(name.to_string(), value.to_string());
        Ok(self)
    }

    pub fn set_lock_mode(&mut self, _lock_mode: LockMode) -> Result<&mut Self> {
        Err(QueryError::unsupported("Illegal attempt to set lock mode on a native query"))
    }

    pub fn set_alias_lock_mode(&mut self, _alias: &str, _lock_mode: LockMode) -> Result<&mut Self> {
        Err(QueryError::unsupported("Illegal attempt to set lock mode on a native query"))
    }

    pub fn apply_entity_graph(&mut self, _graph_name: &str) -> Result<&mut Self> {
        Err(QueryError::unsupported("A native SQL query cannot use EntityGraphs"))
    }

    /// Tables this query reads or writes; restricts the pre-execution flush to them.
    pub fn add_synchronized_query_space(&mut self, space: &str) -> &mut Self {
        if !self.query_spaces.iter().any(|s| s == space) {
            self.query_spaces.push(space.to_string());
        }
        self
    }

    pub fn add_synchronized_entity_name(&mut self, entity_name: &str) -> Result<&mut Self> {
        let persister = self.engine.metamodel().entity(entity_name)?;
        for space in persister.query_spaces() {
            self.add_synchronized_query_space(&space);
        }
        Ok(self)
    }

    // Execution

    fn execution_context(&self) -> ExecutionContext<'_> {
        ExecutionContext {
            session: self.session,
            jdbc: self.jdbc,
            options: &self.options,
            bindings: &self.bindings,
        }
    }

    fn effective_flush_mode(&self) -> FlushMode {
        self.options.flush_mode.unwrap_or_else(|| self.session.flush_mode())
    }

    /// A full flush only runs inside a transaction.
    fn should_flush(&self) -> bool {
        if !self.session.is_transaction_in_progress() {
            return false;
        }
        match self.effective_flush_mode() {
            FlushMode::Always => true,
            FlushMode::Auto => self.engine.settings().jpa_bootstrap,
            FlushMode::Commit | FlushMode::Manual => false,
        }
    }

    fn prepare_for_execution(&self) -> Result<()> {
        if !self.query_spaces.is_empty() {
            let flushed = self.session.auto_flush_if_required(&self.query_spaces)?;
            tracing::debug!(flushed, spaces = ?self.query_spaces, "partial flush before native query");
        } else if self.should_flush() {
            tracing::debug!(flush_mode = ?self.effective_flush_mode(), "flushing session before native query");
            self.session.flush()?;
        }
        Ok(())
    }

    /// The mapping plans are built from; an entity result type with no
    /// declared mapping reads that entity from the selected columns.
    fn effective_mapping(&self) -> Result<ResultSetMapping> {
        match &self.result_type {
            ResultType::Entity(type_name) if self.mapping.is_empty() => {
                let persister = self.engine.metamodel().entity(&type_name.name)?;
                let entity_name = persister.entity_name();
                let alias = entity_name.rsplit('.').next().unwrap_or(entity_name);
                let mut mapping = ResultSetMapping::new();
                mapping.add_result_builder(ResultBuilder::Root(RootReturn::new(alias, entity_name)));
                Ok(mapping)
            }
            _ => Ok(self.mapping.clone()),
        }
    }

    /// SQL with bound lists expanded, used to key plans.
    fn expanded_sql(&self, environment: &PlanEnvironment) -> String {
        environment
            .expander()
            .expand(
                self.interpretation.adjusted_sql(),
                self.interpretation.occurrences(),
                &self.bindings,
            )
            .into_owned()
    }

    /// Substitutes alias placeholders, then re-reads parameters from the
    /// rewritten SQL.
    fn rewrite(&self, context: &dyn ParserContext) -> Result<(Arc<ParameterInterpretation>, bool)> {
        let mut parser = SqlQueryParser::new(&self.sql, context, self.engine.settings());
        let processed = parser.process()?;
        let interpretation = self.engine.interpretation_cache().resolve(&processed)?;
        Ok((interpretation, parser.query_has_aliases()))
    }

    fn create_select_plan(
        &self,
        mapping: &ResultSetMapping,
        environment: PlanEnvironment,
    ) -> Result<NativeSelectQueryPlan> {
        let metamodel = self.engine.metamodel();
        let mut processor = ResultSetMappingProcessor::new(mapping, metamodel);
        processor.process()?;
        let (interpretation, has_aliases) = self.rewrite(&processor)?;
        let resolved = processor.generate_result_mapping(has_aliases)?;

        let reader = RowReader::new(&resolved, metamodel)?;
        self.result_type.validate(&reader.shape())?;

        let sql = environment
            .expander()
            .expand(interpretation.adjusted_sql(), interpretation.occurrences(), &self.bindings)
            .into_owned();
        Ok(NativeSelectQueryPlan::new(
            sql,
            self.query_spaces.clone(),
            interpretation.occurrences().to_vec(),
            reader,
            self.result_type.clone(),
            environment,
        ))
    }

    fn resolve_select_plan(&self) -> Result<Arc<NativeSelectQueryPlan>> {
        let environment = self.engine.plan_environment();
        let mapping = self.effective_mapping()?;

        if self.options.has_limit() {
            tracing::debug!("native query has a row limit, select plan is not cached");
            return self.create_select_plan(&mapping, environment).map(Arc::new);
        }

        let mut query_spaces = self.query_spaces.clone();
        query_spaces.sort();
        let key = SelectInterpretationsKey {
            sql: self.expanded_sql(&environment),
            mapping_identity: mapping.identity(),
            result_type: self.result_type.clone(),
            start_position: environment.start_position,
            query_spaces,
        };
        self.engine
            .plan_cache()
            .resolve_select_plan(key, || self.create_select_plan(&mapping, environment.clone()))
    }

    fn resolve_non_select_plan(&self) -> Result<Arc<NativeNonSelectQueryPlan>> {
        let environment = self.engine.plan_environment();
        let key = NonSelectInterpretationsKey::new(&self.expanded_sql(&environment), &self.query_spaces);

        self.engine.plan_cache().resolve_non_select_plan(key, || {
            let empty = ResultSetMapping::new();
            let mut processor = ResultSetMappingProcessor::new(&empty, self.engine.metamodel());
            processor.process()?;
            let (interpretation, _) = self.rewrite(&processor)?;
            let sql = environment
                .expander()
                .expand(interpretation.adjusted_sql(), interpretation.occurrences(), &self.bindings)
                .into_owned();
            Ok(NativeNonSelectQueryPlan::new(
                sql,
                self.query_spaces.clone(),
                interpretation.occurrences().to_vec(),
                environment.clone(),
            ))
        })
    }

    pub fn list(&self) -> Result<Vec<ResultValue>> {
        self.bindings.validate(&self.interpretation)?;
        self.prepare_for_execution()?;
        let plan = self.resolve_select_plan()?;
        plan.perform_list(&self.execution_context())
    }

    pub fn scroll(&self) -> Result<ScrollableResults> {
        self.bindings.validate(&self.interpretation)?;
        self.prepare_for_execution()?;
        let plan = self.resolve_select_plan()?;
        plan.perform_scroll(&self.execution_context())
    }

    /// `None` without rows; more than one row is an error.
    pub fn single_result(&self) -> Result<Option<ResultValue>> {
        let mut results = self.list()?;
        match results.len() {
            0 => Ok(None),
            1 => Ok(results.pop()),
            n => Err(QueryError::shape(format!("Query did not return a unique result: {}", n))),
        }
    }

    /// Like `single_result`, but repeated rows of the same value count once.
    pub fn unique_result(&self) -> Result<Option<ResultValue>> {
        let mut results = self.list()?.into_iter();
        let Some(first) = results.next() else {
            return Ok(None);
        };
        let mut count = 1;
        let mut all_equal = true;
        for other in results {
            count += 1;
            all_equal &= other == first;
        }
        if all_equal {
            Ok(Some(first))
        } else {
            Err(QueryError::shape(format!("Query did not return a unique result: {}", count)))
        }
    }

    pub fn execute_update(&self) -> Result<u64> {
        self.bindings.validate(&self.interpretation)?;
        let plan = self.resolve_non_select_plan()?;
        plan.execute_update(&self.execution_context())
    }

    /// Captures this query so it can be registered and recreated by name.
    pub fn to_memento(&self, name: &str) -> NamedNativeQueryMemento {
        NamedNativeQueryMemento {
            name: name.to_string(),
            sql: self.sql.clone(),
            result_set_mapping: self.mapping.name().map(str::to_string),
            query_spaces: self.query_spaces.clone(),
            parameters: self.interpretation.parameters().map(QueryParameter::label).collect(),
            cacheable: self.options.cacheable,
            cache_region: self.options.cache_region.clone(),
            flush_mode: self.options.flush_mode,
            read_only: self.options.read_only,
            lock_options: self.options.lock_options,
            timeout: self.options.timeout,
            fetch_size: self.options.fetch_size,
            comment: self.options.comment.clone(),
            hints: self.options.hints.clone(),
        }
    }
}

fn parse_hint<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| QueryError::binding(format!("Invalid value [{}] for query hint [{}]", value, name)))
}

fn parse_flush_mode(value: &str) -> Result<FlushMode> {
    match value.trim().to_ascii_uppercase().as_str() {
        "MANUAL" => Ok(FlushMode::Manual),
        "COMMIT" => Ok(FlushMode::Commit),
        "AUTO" => Ok(FlushMode::Auto),
        "ALWAYS" => Ok(FlushMode::Always),
        _ => Err(QueryError::binding(format!(
            "Invalid value [{}] for query hint [{}]",
            value, HINT_FLUSH_MODE
        ))),
    }
}
