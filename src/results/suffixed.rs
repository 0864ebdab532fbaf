use indexmap::IndexMap;

use crate::metamodel::{EntityPersister, PropertyType};
use crate::plan::LockMode;
use crate::results::RootReturn;

/// Receives properties and nested fetches while a result builder is filled in.
pub trait FetchBuilderContainer {
    fn add_property(&mut self, name: &str, column_aliases: Vec<String>);

    fn add_fetch(&mut self, name: &str, fetch: FetchNode);
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchNode {
    Component(ComponentFetch),
    Legacy(LegacyFetch),
}

/// Embedded value; its parts are read from the owner's columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentFetch {
    pub property_name: String,
    pub properties: IndexMap<String, Vec<String>>,
    pub fetches: IndexMap<String, FetchNode>,
}

impl ComponentFetch {
    pub fn new(property_name: &str) -> Self {
        Self {
            property_name: property_name.to_string(),
            ..Default::default()
        }
    }
}

impl FetchBuilderContainer for ComponentFetch {
    fn add_property(&mut self, name: &str, column_aliases: Vec<String>) {
        self.properties.insert(name.to_string(), column_aliases);
    }

    fn add_fetch(&mut self, name: &str, fetch: FetchNode) {
        self.fetches.insert(name.to_string(), fetch);
    }
}

/// Association fetched through a user-declared alias.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyFetch {
    pub table_alias: String,
    pub owner_alias: String,
    pub fetchable_name: String,
    /// Owner-side columns linking to the fetched rows.
    pub column_names: Vec<String>,
    pub entity: Option<Box<SuffixedEntityResult>>,
}

/// Entity result whose columns are read by explicit alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SuffixedEntityResult {
    pub table_alias: String,
    pub entity_name: String,
    pub navigable_path: String,
    pub lock_mode: LockMode,
    pub id_column_aliases: Vec<String>,
    pub identifier_property: Option<String>,
    pub discriminator_alias: Option<String>,
    pub properties: IndexMap<String, Vec<String>>,
    pub fetches: IndexMap<String, FetchNode>,
}

impl SuffixedEntityResult {
    pub fn new(table_alias: &str, entity_name: &str, navigable_path: &str) -> Self {
        Self {
            table_alias: table_alias.to_string(),
            entity_name: entity_name.to_string(),
            navigable_path: navigable_path.to_string(),
            lock_mode: LockMode::None,
            id_column_aliases: Vec::new(),
            identifier_property: None,
            discriminator_alias: None,
            properties: IndexMap::new(),
            fetches: IndexMap::new(),
        }
    }

    /// Reads the entity by its physical column names, used when the query
    /// text carried no alias placeholders.
    pub fn from_column_names(root: &RootReturn, persister: &dyn EntityPersister) -> Self {
        let path = format!("{}({})", persister.entity_name(), root.table_alias);
        let mut result = Self::new(&root.table_alias, persister.entity_name(), &path);
        result.lock_mode = root.lock_mode;
        result.id_column_aliases = root
            .property_results
            .get(persister.identifier_property_name().unwrap_or("id"))
            .cloned()
            .unwrap_or_else(|| persister.identifier_column_names());
        result.identifier_property = persister.identifier_property_name().map(str::to_string);
        result.discriminator_alias = persister.discriminator_column_name();

        for (index, name) in persister.property_names().iter().enumerate() {
            if !persister.is_property_selectable(index) {
                continue;
            }
            if let Some(columns) = root.property_results.get(name) {
                result.add_property(name, columns.clone());
                continue;
            }
            match persister.property_type(name) {
                Some(PropertyType::Collection { .. }) | None => {}
                Some(PropertyType::Component(parts)) => {
                    let mut component = ComponentFetch::new(name);
                    for part in parts {
                        let path = format!("{}.{}", name, part.name);
                        component.add_property(&part.name, persister.property_column_names(&path));
                    }
                    result.add_fetch(name, FetchNode::Component(component));
                }
                Some(_) => result.add_property(name, persister.property_column_names(name)),
            }
        }
        result
    }
}

impl FetchBuilderContainer for SuffixedEntityResult {
    fn add_property(&mut self, name: &str, column_aliases: Vec<String>) {
        self.properties.insert(name.to_string(), column_aliases);
    }

    fn add_fetch(&mut self, name: &str, fetch: FetchNode) {
        self.fetches.insert(name.to_string(), fetch);
    }
}

/// Collection result whose key, index and element columns are read by alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SuffixedCollectionResult {
    pub table_alias: String,
    pub navigable_path: String,
    pub role: String,
    pub key_column_aliases: Vec<String>,
    pub index_column_aliases: Option<Vec<String>>,
    pub element_column_aliases: Vec<String>,
}

#[cfg(test)]
mod tests {
    use crate::_fixtures::fixtures::person_mapping;
    use crate::results::{FetchNode, RootReturn, SuffixedEntityResult};

    #[test]
    pub fn test_from_column_names() {
        let person = person_mapping();
        let root = RootReturn::new("p", "Person").add_property("age", "years");

        let result = SuffixedEntityResult::from_column_names(&root, &person);

        assert_eq!(result.navigable_path, "Person(p)");
        assert_eq!(result.id_column_aliases, vec!["id"]);
        assert_eq!(result.properties["name"], vec!["name"]);
        assert_eq!(result.properties["age"], vec!["years"]);
        assert_eq!(result.properties["employer"], vec!["employer_id"]);
        assert!(!result.properties.contains_key("phones"));
        assert!(!result.properties.contains_key("notes"));
        match &result.fetches["address"] {
            FetchNode::Component(component) => {
                assert_eq!(component.properties["city"], vec!["city"]);
            }
            other => panic!("unexpected fetch {:?}", other),
        }
    }
}
