use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::metamodel::{CollectionPersister, EntityPersister, MappingMetamodel, PropertyType};
use crate::plan::LockMode;
use crate::results::{
    collection_suffix, entity_suffix, CollectionReturn, ComponentFetch, FetchBuilderContainer, FetchNode,
    FetchReturn, LegacyFetch, PropertyResults, ResultBuilder, ResultSetMapping, RootReturn,
    SuffixedCollectionResult, SuffixedEntityResult,
};
use crate::sql::ParserContext;
use crate::{QueryError, Result};

#[derive(Debug, Clone)]
enum ReturnNode {
    Root(RootReturn),
    Collection(CollectionReturn),
    Fetch(FetchReturn),
}

/// Owner-side link from a fetch to the alias that owns it.
#[derive(Debug)]
struct FetchEdge {
    alias: String,
    fetchable_name: String,
    column_names: Vec<String>,
}

/// Assigns column alias suffixes to every entity and collection alias of a
/// result set mapping, and rewrites the mapping to read by those aliases.
pub struct ResultSetMappingProcessor<'a> {
    mapping: &'a ResultSetMapping,
    metamodel: &'a dyn MappingMetamodel,

    alias_to_return: IndexMap<String, ReturnNode>,
    alias_to_owner_alias: HashMap<String, String>,

    alias_to_persister: HashMap<String, Arc<dyn EntityPersister>>,
    alias_to_suffix: HashMap<String, String>,

    alias_to_collection_persister: HashMap<String, Arc<dyn CollectionPersister>>,
    alias_to_collection_suffix: HashMap<String, String>,

    entity_property_results: HashMap<String, PropertyResults>,
    collection_property_results: HashMap<String, PropertyResults>,

    entity_suffix_seed: usize,
    collection_suffix_seed: usize,
    in_progress: HashSet<String>,
}

impl<'a> ResultSetMappingProcessor<'a> {
    pub fn new(mapping: &'a ResultSetMapping, metamodel: &'a dyn MappingMetamodel) -> Self {
        Self {
            mapping,
            metamodel,
            alias_to_return: IndexMap::new(),
            alias_to_owner_alias: HashMap::new(),
            alias_to_persister: HashMap::new(),
            alias_to_suffix: HashMap::new(),
            alias_to_collection_persister: HashMap::new(),
            alias_to_collection_suffix: HashMap::new(),
            entity_property_results: HashMap::new(),
            collection_property_results: HashMap::new(),
            entity_suffix_seed: 0,
            collection_suffix_seed: 0,
            in_progress: HashSet::new(),
        }
    }

    /// Resolves every alias to its persister and suffix.
    pub fn process(&mut self) -> Result<&Self> {
        let mapping = self.mapping;

        for builder in mapping.builders() {
            match builder {
                ResultBuilder::Root(root) => {
                    self.register_return(&root.table_alias, ReturnNode::Root(root.clone()))?;
                }
                ResultBuilder::Collection(collection) => {
                    self.register_return(&collection.table_alias, ReturnNode::Collection(collection.clone()))?;
                    self.add_collection(
                        &collection.role(),
                        &collection.table_alias,
                        collection.property_results.clone(),
                    )?;
                }
                _ => {}
            }
        }

        for fetch in mapping.legacy_fetches() {
            self.register_return(&fetch.table_alias, ReturnNode::Fetch(fetch.clone()))?;
            self.alias_to_owner_alias
                .insert(fetch.table_alias.clone(), fetch.owner_alias.clone());
        }

        let aliases: Vec<String> = self.alias_to_return.keys().cloned().collect();
        for alias in aliases {
            self.process_return(&alias)?;
        }

        Ok(self)
    }

    fn register_return(&mut self, alias: &str, node: ReturnNode) -> Result<()> {
        if self.alias_to_return.contains_key(alias) {
            return Err(QueryError::alias(format!(
                "Duplicate alias [{}] in result set mapping",
                alias
            )));
        }
        self.alias_to_return.insert(alias.to_string(), node);
        Ok(())
    }

    fn process_return(&mut self, alias: &str) -> Result<()> {
        match self.alias_to_return.get(alias).cloned() {
            Some(ReturnNode::Root(root)) => self.process_root_return(&root),
            Some(ReturnNode::Fetch(fetch)) => self.process_fetch_return(&fetch),
            Some(ReturnNode::Collection(_)) | None => Ok(()),
        }
    }

    fn process_root_return(&mut self, root: &RootReturn) -> Result<()> {
        if self.alias_to_persister.contains_key(&root.table_alias) {
            return Ok(());
        }
        let persister = self.metamodel.entity(&root.entity_name)?;
        self.add_persister(&root.table_alias, root.property_results.clone(), persister);
        Ok(())
    }

    fn process_fetch_return(&mut self, fetch: &FetchReturn) -> Result<()> {
        let alias = fetch.table_alias.as_str();
        if self.alias_to_persister.contains_key(alias) || self.alias_to_collection_persister.contains_key(alias) {
            return Ok(());
        }

        let owner_alias = fetch.owner_alias.as_str();
        if !self.alias_to_return.contains_key(owner_alias) {
            return Err(QueryError::alias(format!(
                "Owner alias [{}] is unknown for alias [{}]",
                owner_alias, alias
            )));
        }

        if !self.alias_to_persister.contains_key(owner_alias) {
            if !self.in_progress.insert(alias.to_string()) {
                return Err(QueryError::alias(format!(
                    "Circular owner aliases detected at alias [{}]",
                    alias
                )));
            }
            self.process_return(owner_alias)?;
            self.in_progress.remove(alias);
        }

        let owner = self.alias_to_persister.get(owner_alias).cloned().ok_or_else(|| {
            QueryError::alias(format!(
                "Owner alias [{}] of alias [{}] does not refer to an entity",
                owner_alias, alias
            ))
        })?;

        match owner.property_type(&fetch.fetchable_name) {
            Some(PropertyType::Collection { .. }) => {
                let role = format!("{}.{}", owner.entity_name(), fetch.fetchable_name);
                self.add_collection(&role, alias, fetch.property_results.clone())
            }
            Some(PropertyType::ToOne { associated_entity, .. }) => {
                let persister = self.metamodel.entity(&associated_entity)?;
                self.add_persister(alias, fetch.property_results.clone(), persister);
                Ok(())
            }
            Some(_) => Err(QueryError::alias(format!(
                "Property [{}] of alias [{}] is not an association and cannot be fetched as [{}]",
                fetch.fetchable_name, owner_alias, alias
            ))),
            None => Err(QueryError::alias(format!(
                "Unknown property [{}] on entity [{}] for alias [{}]",
                fetch.fetchable_name,
                owner.entity_name(),
                alias
            ))),
        }
    }

    fn add_persister(&mut self, alias: &str, property_results: PropertyResults, persister: Arc<dyn EntityPersister>) {
        let suffix = entity_suffix(self.entity_suffix_seed);
        self.entity_suffix_seed += 1;
        tracing::trace!(alias, suffix = %suffix, "mapping alias to entity suffix");

        self.alias_to_persister.insert(alias.to_string(), persister);
        self.alias_to_suffix.insert(alias.to_string(), suffix);
        self.entity_property_results.insert(alias.to_string(), property_results);
    }

    fn add_collection(&mut self, role: &str, alias: &str, property_results: PropertyResults) -> Result<()> {
        let persister = self.metamodel.collection(role)?;
        let suffix = collection_suffix(self.collection_suffix_seed);
        self.collection_suffix_seed += 1;
        tracing::trace!(alias, suffix = %suffix, "mapping alias to collection suffix");

        self.alias_to_collection_persister
            .insert(alias.to_string(), persister.clone());
        self.alias_to_collection_suffix.insert(alias.to_string(), suffix);

        if persister.is_one_to_many() || persister.is_many_to_many() {
            let element_name = persister.element_entity_name().ok_or_else(|| {
                QueryError::mapping(format!("Collection [{}] has no element entity", role))
            })?;
            let element = self.metamodel.entity(element_name)?;
            self.add_persister(alias, element_properties(&property_results), element);
        }

        self.collection_property_results
            .insert(alias.to_string(), property_results);
        Ok(())
    }

    /// Owner alias recorded for a fetch alias.
    pub fn owner_alias(&self, alias: &str) -> Option<&str> {
        self.alias_to_owner_alias.get(alias).map(String::as_str)
    }

    /// Rewrites the mapping to read by suffixed column aliases. Without alias
    /// placeholders in the SQL the original mapping is used as-is.
    pub fn generate_result_mapping(&self, query_had_aliases: bool) -> Result<ResultSetMapping> {
        if !query_had_aliases {
            return Ok(self.mapping.clone());
        }

        let mut entity_builders: HashMap<String, SuffixedEntityResult> = HashMap::new();
        for builder in self.mapping.builders() {
            if let ResultBuilder::Root(root) = builder {
                if let Some(suffix) = self.alias_to_suffix.get(&root.table_alias) {
                    let persister = self.persister(&root.table_alias)?;
                    let built = self.create_suffixed_entity(
                        persister.as_ref(),
                        &root.table_alias,
                        suffix,
                        root.lock_mode,
                        &self.navigable_path(&root.table_alias),
                    );
                    entity_builders.insert(root.table_alias.clone(), built);
                }
            }
        }

        let mut edges: IndexMap<String, Vec<FetchEdge>> = IndexMap::new();
        let mut unattached: Vec<FetchReturn> = Vec::new();
        for fetch in self.mapping.legacy_fetches() {
            let Some(suffix) = self.alias_to_suffix.get(&fetch.table_alias) else {
                unattached.push(fetch.clone());
                continue;
            };
            let (Some(owner), Some(owner_suffix)) = (
                self.alias_to_persister.get(&fetch.owner_alias),
                self.alias_to_suffix.get(&fetch.owner_alias),
            ) else {
                unattached.push(fetch.clone());
                continue;
            };

            let persister = self.persister(&fetch.table_alias)?;
            let mut built = self.create_suffixed_entity(
                persister.as_ref(),
                &fetch.table_alias,
                suffix,
                fetch.lock_mode,
                &self.navigable_path(&fetch.table_alias),
            );

            let mut column_names = owner.property_column_aliases(&fetch.fetchable_name, owner_suffix);
            if column_names.is_empty() {
                if let Some(collection) = self.alias_to_collection_persister.get(&fetch.table_alias) {
                    let collection_suffix = self
                        .alias_to_collection_suffix
                        .get(&fetch.table_alias)
                        .map(String::as_str)
                        .unwrap_or_default();
                    column_names = collection.key_column_aliases(collection_suffix);
                    if collection.has_index() {
                        built.add_property("index", collection.index_column_aliases(collection_suffix));
                    }
                }
            }

            entity_builders.insert(fetch.table_alias.clone(), built);
            edges.entry(fetch.owner_alias.clone()).or_default().push(FetchEdge {
                alias: fetch.table_alias.clone(),
                fetchable_name: fetch.fetchable_name.clone(),
                column_names,
            });
        }

        let mut result = match self.mapping.name() {
            Some(name) => ResultSetMapping::named(name),
            None => ResultSetMapping::new(),
        };
        let mut attached: HashSet<String> = HashSet::new();

        for builder in self.mapping.builders() {
            let rewritten = match builder {
                ResultBuilder::Root(root) if entity_builders.contains_key(&root.table_alias) => {
                    match assemble(&root.table_alias, &mut entity_builders, &edges, &mut attached) {
                        Some(entity) => ResultBuilder::Entity(entity),
                        None => builder.clone(),
                    }
                }
                ResultBuilder::Collection(collection) => {
                    match self.alias_to_collection_suffix.get(&collection.table_alias) {
                        Some(suffix) => ResultBuilder::CollectionResult(
                            self.create_suffixed_collection(collection, suffix)?,
                        ),
                        None => builder.clone(),
                    }
                }
                other => other.clone(),
            };
            result.add_result_builder(rewritten);
        }

        for fetch in self.mapping.legacy_fetches() {
            if !attached.contains(&fetch.table_alias) && !unattached.contains(fetch) {
                unattached.push(fetch.clone());
            }
        }
        for fetch in unattached {
            result.add_legacy_fetch(fetch);
        }

        Ok(result)
    }

    fn persister(&self, alias: &str) -> Result<Arc<dyn EntityPersister>> {
        self.alias_to_persister
            .get(alias)
            .cloned()
            .ok_or_else(|| QueryError::alias(format!("Alias [{}] was not processed", alias)))
    }

    fn navigable_path(&self, alias: &str) -> String {
        match self.alias_to_return.get(alias) {
            Some(ReturnNode::Root(root)) => format!("{}({})", root.entity_name, root.table_alias),
            Some(ReturnNode::Collection(collection)) => {
                format!("{}({})", collection.role(), collection.table_alias)
            }
            Some(ReturnNode::Fetch(fetch)) => {
                format!("{}.{}", self.navigable_path(&fetch.owner_alias), fetch.fetchable_name)
            }
            None => alias.to_string(),
        }
    }

    fn create_suffixed_entity(
        &self,
        persister: &dyn EntityPersister,
        alias: &str,
        suffix: &str,
        lock_mode: LockMode,
        navigable_path: &str,
    ) -> SuffixedEntityResult {
        let overrides = self.entity_property_results.get(alias);
        let mut result = SuffixedEntityResult::new(alias, persister.entity_name(), navigable_path);
        result.lock_mode = lock_mode;

        let id_property = persister.identifier_property_name();
        let identifier_aliases = id_property
            .and_then(|id| overrides.and_then(|o| o.get(id)).cloned())
            .unwrap_or_else(|| persister.identifier_aliases(suffix));
        result.id_column_aliases = identifier_aliases.clone();
        result.discriminator_alias = persister.discriminator_alias(suffix);
        if let Some(id) = id_property {
            result.identifier_property = Some(id.to_string());
            result.add_property(id, identifier_aliases.clone());
        }

        for (index, name) in persister.property_names().iter().enumerate() {
            if !persister.is_property_selectable(index) {
                continue;
            }
            let Some(property_type) = persister.property_type(name) else {
                continue;
            };
            let column_aliases = overrides
                .and_then(|o| o.get(name))
                .cloned()
                .unwrap_or_else(|| persister.property_column_aliases(name, suffix));
            add_fetch_builder(
                suffix,
                persister,
                &mut result,
                &identifier_aliases,
                name,
                &column_aliases,
                &property_type,
            );
        }

        result
    }

    fn create_suffixed_collection(
        &self,
        collection: &CollectionReturn,
        suffix: &str,
    ) -> Result<SuffixedCollectionResult> {
        let alias = collection.table_alias.as_str();
        let persister = self
            .alias_to_collection_persister
            .get(alias)
            .ok_or_else(|| QueryError::alias(format!("Alias [{}] was not processed", alias)))?;

        let element_column_aliases = match (
            persister.element_entity_name(),
            self.alias_to_persister.get(alias),
            self.alias_to_suffix.get(alias),
        ) {
            (Some(_), Some(element), Some(entity_suffix)) => {
                // element overrides are stored with the `element.` prefix already removed
                let overrides = self.entity_property_results.get(alias);
                let override_of = |name: &str| overrides.and_then(|o| o.get(name)).cloned();

                let mut aliases = element
                    .identifier_property_name()
                    .and_then(override_of)
                    .unwrap_or_else(|| element.identifier_aliases(entity_suffix));
                aliases.extend(element.discriminator_alias(entity_suffix));
                for (index, name) in element.property_names().iter().enumerate() {
                    aliases.extend(
                        override_of(name.as_str()).unwrap_or_else(|| element.property_aliases(entity_suffix, index)),
                    );
                }
                aliases
            }
            _ => persister.element_column_aliases(suffix),
        };

        Ok(SuffixedCollectionResult {
            table_alias: alias.to_string(),
            navigable_path: self.navigable_path(alias),
            role: persister.role().to_string(),
            key_column_aliases: persister.key_column_aliases(suffix),
            index_column_aliases: persister
                .has_index()
                .then(|| persister.index_column_aliases(suffix)),
            element_column_aliases,
        })
    }
}

fn add_fetch_builder(
    suffix: &str,
    persister: &dyn EntityPersister,
    container: &mut dyn FetchBuilderContainer,
    identifier_aliases: &[String],
    property_name: &str,
    column_aliases: &[String],
    property_type: &PropertyType,
) {
    match property_type {
        PropertyType::Collection { lhs_property, .. } => {
            let key_aliases = match lhs_property {
                None => identifier_aliases.to_vec(),
                Some(lhs) => persister.property_column_aliases(lhs, suffix),
            };
            container.add_property(property_name, key_aliases);
        }
        PropertyType::Component(parts) => {
            let mut component = ComponentFetch::new(property_name);
            let mut offset = 0;
            for part in parts {
                let span = part.property_type.column_span();
                let slice = column_aliases.get(offset..offset + span).unwrap_or(&[]);
                add_fetch_builder(
                    suffix,
                    persister,
                    &mut component,
                    identifier_aliases,
                    &part.name,
                    slice,
                    &part.property_type,
                );
                offset += span;
            }
            container.add_fetch(property_name, FetchNode::Component(component));
        }
        _ if column_aliases.is_empty() => {}
        PropertyType::ToOne { identifying_table, target_key_property, .. }
            if identifying_table.as_str() != persister.table_name() =>
        {
            container.add_property(property_name, vec![target_key_property.clone()]);
        }
        _ => container.add_property(property_name, column_aliases.to_vec()),
    }
}

/// Moves the builder for `alias` out of `builders`, attaching its fetches first.
fn assemble(
    alias: &str,
    builders: &mut HashMap<String, SuffixedEntityResult>,
    edges: &IndexMap<String, Vec<FetchEdge>>,
    attached: &mut HashSet<String>,
) -> Option<SuffixedEntityResult> {
    let mut builder = builders.remove(alias)?;
    for edge in edges.get(alias).into_iter().flatten() {
        let entity = assemble(&edge.alias, builders, edges, attached);
        attached.insert(edge.alias.clone());
        builder.add_fetch(
            &edge.fetchable_name,
            FetchNode::Legacy(LegacyFetch {
                table_alias: edge.alias.clone(),
                owner_alias: alias.to_string(),
                fetchable_name: edge.fetchable_name.clone(),
                column_names: edge.column_names.clone(),
                entity: entity.map(Box::new),
            }),
        );
    }
    Some(builder)
}

/// Property results addressed to the collection element, with `element.` removed.
fn element_properties(property_results: &PropertyResults) -> PropertyResults {
    property_results
        .iter()
        .filter_map(|(path, aliases)| {
            path.strip_prefix("element.")
                .map(|stripped| (stripped.to_string(), aliases.clone()))
        })
        .collect()
}

impl ParserContext for ResultSetMappingProcessor<'_> {
    fn entity_persister(&self, alias: &str) -> Option<Arc<dyn EntityPersister>> {
        self.alias_to_persister.get(alias).cloned()
    }

    fn collection_persister(&self, alias: &str) -> Option<Arc<dyn CollectionPersister>> {
        self.alias_to_collection_persister.get(alias).cloned()
    }

    fn entity_suffix(&self, alias: &str) -> Option<&str> {
        self.alias_to_suffix.get(alias).map(String::as_str)
    }

    fn collection_suffix(&self, alias: &str) -> Option<&str> {
        self.alias_to_collection_suffix.get(alias).map(String::as_str)
    }

    fn property_results(&self, alias: &str) -> Option<&PropertyResults> {
        self.collection_property_results
            .get(alias)
            .or_else(|| self.entity_property_results.get(alias))
    }
}
