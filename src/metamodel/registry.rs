use std::sync::Arc;

use indexmap::IndexMap;

use crate::metamodel::{
    CollectionMapping, CollectionPersister, EntityMapping, EntityPersister, MappingMetamodel,
};

/// Metamodel backed by in-memory mappings, registered up front.
#[derive(Debug, Default)]
pub struct MetamodelRegistry {
    entities: IndexMap<String, Arc<EntityMapping>>,
    collections: IndexMap<String, Arc<CollectionMapping>>,
}

impl MetamodelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, mapping: EntityMapping) -> Self {
        self.register_entity(mapping);
        self
    }

    pub fn with_collection(mut self, mapping: CollectionMapping) -> Self {
        self.register_collection(mapping);
        self
    }

    pub fn register_entity(&mut self, mapping: EntityMapping) {
        self.entities.insert(mapping.entity_name().to_string(), Arc::new(mapping));
    }

    pub fn register_collection(&mut self, mapping: CollectionMapping) {
        self.collections.insert(mapping.role().to_string(), Arc::new(mapping));
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

fn unqualify(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl MappingMetamodel for MetamodelRegistry {
    fn find_entity(&self, name: &str) -> Option<Arc<dyn EntityPersister>> {
        if let Some(found) = self.entities.get(name) {
            return Some(found.clone() as Arc<dyn EntityPersister>);
        }
        // Fall back to the unqualified name, when it is unambiguous.
        let mut matches = self
            .entities
            .iter()
            .filter(|(key, _)| unqualify(key) == unqualify(name));
        match (matches.next(), matches.next()) {
            (Some((_, found)), None) => Some(found.clone() as Arc<dyn EntityPersister>),
            _ => None,
        }
    }

    fn find_collection(&self, role: &str) -> Option<Arc<dyn CollectionPersister>> {
        self.collections
            .get(role)
            .map(|found| found.clone() as Arc<dyn CollectionPersister>)
    }
}
