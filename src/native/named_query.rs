use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FlushMode;
use crate::plan::LockOptions;
use crate::results::{
    CollectionReturn, FetchReturn, InstantiationReturn, PropertyResults, ResultBuilder, ResultSetMapping, RootReturn,
    ScalarReturn, ScalarType,
};
use crate::{QueryError, Result};

/// Everything needed to rebuild a native query registered under a name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedNativeQueryMemento {
    pub name: String,
    pub sql: String,
    pub result_set_mapping: Option<String>,
    pub query_spaces: Vec<String>,
    /// Parameter labels the query is expected to declare (`name`, `1`, ...).
    pub parameters: Vec<String>,
    pub cacheable: bool,
    pub cache_region: Option<String>,
    pub flush_mode: Option<FlushMode>,
    pub read_only: Option<bool>,
    pub lock_options: LockOptions,
    pub timeout: Option<u32>,
    pub fetch_size: Option<u32>,
    pub comment: Option<String>,
    pub hints: IndexMap<String, String>,
}

impl NamedNativeQueryMemento {
    pub fn new(name: &str, sql: &str) -> Self {
        Self {
            name: name.to_string(),
            sql: sql.to_string(),
            ..Default::default()
        }
    }

    pub fn with_result_set_mapping(mut self, mapping_name: &str) -> Self {
        self.result_set_mapping = Some(mapping_name.to_string());
        self
    }

    pub fn with_query_space(mut self, space: &str) -> Self {
        self.query_spaces.push(space.to_string());
        self
    }
}

/// One declared result of a [`ResultSetMappingDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingEntry {
    Entity {
        alias: String,
        entity: String,
        #[serde(default)]
        properties: PropertyResults,
    },
    Collection {
        alias: String,
        role: String,
        #[serde(default)]
        properties: PropertyResults,
    },
    Fetch {
        alias: String,
        owner_alias: String,
        property: String,
        #[serde(default)]
        properties: PropertyResults,
    },
    Scalar {
        column: String,
        #[serde(default)]
        scalar_type: Option<ScalarType>,
    },
    Instantiation {
        target: String,
        columns: Vec<String>,
    },
}

/// A result-set mapping declared once and applied to queries by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultSetMappingDefinition {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<MappingEntry>,
}

impl ResultSetMappingDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, entry: MappingEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn to_mapping(&self) -> Result<ResultSetMapping> {
        let mut mapping = ResultSetMapping::named(&self.name);
        for entry in &self.entries {
            match entry {
                MappingEntry::Entity {
                    alias,
                    entity,
                    properties,
                } => {
                    let mut root = RootReturn::new(alias, entity);
                    root.property_results = properties.clone();
                    mapping.add_result_builder(ResultBuilder::Root(root));
                }
                MappingEntry::Collection {
                    alias,
                    role,
                    properties,
                } => {
                    let (owner, property) = split_role(role)?;
                    let mut collection = CollectionReturn::new(alias, owner, property);
                    collection.property_results = properties.clone();
                    mapping.add_result_builder(ResultBuilder::Collection(collection));
                }
                MappingEntry::Fetch {
                    alias,
                    owner_alias,
                    property,
                    properties,
                } => {
                    let mut fetch = FetchReturn::new(alias, owner_alias, property);
                    fetch.property_results = properties.clone();
                    mapping.add_legacy_fetch(fetch);
                }
                MappingEntry::Scalar { column, scalar_type } => {
                    let scalar = match scalar_type {
                        Some(scalar_type) => ScalarReturn::typed(column, *scalar_type),
                        None => ScalarReturn::new(column),
                    };
                    mapping.add_result_builder(ResultBuilder::Scalar(scalar));
                }
                MappingEntry::Instantiation { target, columns } => {
                    mapping.add_result_builder(ResultBuilder::Instantiation(InstantiationReturn {
                        target: target.clone(),
                        arguments: columns.iter().map(|c| ScalarReturn::new(c)).collect(),
                    }));
                }
            }
        }
        Ok(mapping)
    }
}

/// Splits `Owner.property` at the last dot.
pub fn split_role(role: &str) -> Result<(&str, &str)> {
    match role.rsplit_once('.') {
        Some((owner, property)) if !owner.is_empty() && !property.is_empty() => Ok((owner, property)),
        _ => Err(QueryError::mapping(format!(
            "Collection role [{}] should be in form [OwnerEntity].[property]",
            role
        ))),
    }
}

pub trait NamedQueryRepository: Debug + Send + Sync {
    fn get_native_query_memento(&self, name: &str) -> Option<Arc<NamedNativeQueryMemento>>;

    fn get_result_set_mapping(&self, name: &str) -> Option<Arc<ResultSetMappingDefinition>>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegistryDocument {
    queries: Vec<NamedNativeQueryMemento>,
    result_set_mappings: Vec<ResultSetMappingDefinition>,
}

#[derive(Debug, Default)]
struct RegistryState {
    queries: IndexMap<String, Arc<NamedNativeQueryMemento>>,
    mappings: IndexMap<String, Arc<ResultSetMappingDefinition>>,
}

/// In-memory named queries and result-set mappings.
///
/// Registering a name twice replaces the earlier entry.
#[derive(Debug, Default)]
pub struct NamedQueryRegistry {
    state: RwLock<RegistryState>,
}

impl NamedQueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, memento: NamedNativeQueryMemento) -> Result<()> {
        if memento.name.trim().is_empty() {
            return Err(QueryError::mapping("Named native query must have a name"));
        }
        if memento.sql.trim().is_empty() {
            return Err(QueryError::mapping(format!(
                "Named native query [{}] has no SQL",
                memento.name
            )));
        }
        tracing::debug!(name = %memento.name, "registering named native query");
        self.write()
            .queries
            .insert(memento.name.clone(), Arc::new(memento));
        Ok(())
    }

    pub fn register_result_set_mapping(&self, definition: ResultSetMappingDefinition) -> Result<()> {
        if definition.name.trim().is_empty() {
            return Err(QueryError::mapping("Result set mapping must have a name"));
        }
        definition.to_mapping()?;
        tracing::debug!(name = %definition.name, "registering result set mapping");
        self.write()
            .mappings
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Accepts a JSON array of queries, or an object with `queries` and
    /// `result_set_mappings` arrays. Returns how many entries were registered.
    pub fn load_from_json(&self, json_value: Value) -> Result<usize> {
        let document = match json_value {
            Value::Array(_) => RegistryDocument {
                queries: serde_json::from_value(json_value)?,
                result_set_mappings: Vec::new(),
            },
            Value::Object(_) => serde_json::from_value(json_value)?,
            _ => {
                return Err(QueryError::mapping(
                    "Named query document must be a JSON array or object",
                ));
            }
        };

        let count = document.queries.len() + document.result_set_mappings.len();
        for definition in document.result_set_mappings {
            self.register_result_set_mapping(definition)?;
        }
        for memento in document.queries {
            self.register(memento)?;
        }
        Ok(count)
    }

    pub fn load_from_file(&self, file_path: impl AsRef<Path>) -> Result<usize> {
        let file_content = fs::read_to_string(file_path.as_ref())?;
        let json_value = serde_json::from_str::<Value>(&file_content)?;
        let count = self.load_from_json(json_value)?;
        tracing::debug!(count, path = %file_path.as_ref().display(), "loaded named native queries");
        Ok(count)
    }

    pub fn query_names(&self) -> Vec<String> {
        self.read().queries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().queries.is_empty()
    }
}

impl NamedQueryRepository for NamedQueryRegistry {
    fn get_native_query_memento(&self, name: &str) -> Option<Arc<NamedNativeQueryMemento>> {
        self.read().queries.get(name).cloned()
    }

    fn get_result_set_mapping(&self, name: &str) -> Option<Arc<ResultSetMappingDefinition>> {
        self.read().mappings.get(name).cloned()
    }
}
