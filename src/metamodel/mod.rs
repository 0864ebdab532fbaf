//! Mapping metadata consumed by result mapping and SQL rewriting.
//!
//! The traits are the seams to a full object-relational mapper; the in-memory
//! mappings implement them for embedding and tests.

use std::fmt::Debug;
use std::sync::Arc;

use crate::{QueryError, Result};

pub mod property_type;
pub use property_type::*;

pub mod alias;
pub use alias::*;

pub mod entity_mapping;
pub use entity_mapping::*;

pub mod collection_mapping;
pub use collection_mapping::*;

pub mod registry;
pub use registry::*;

pub trait EntityPersister: Debug + Send + Sync {
    fn entity_name(&self) -> &str;

    fn type_name(&self) -> TypeName;

    fn table_name(&self) -> &str;

    /// Tables whose modification affects query results over this entity.
    fn query_spaces(&self) -> Vec<String>;

    fn identifier_property_name(&self) -> Option<&str>;

    fn identifier_column_names(&self) -> Vec<String>;

    fn identifier_aliases(&self, suffix: &str) -> Vec<String>;

    fn discriminator_column_name(&self) -> Option<String>;

    fn discriminator_alias(&self, suffix: &str) -> Option<String>;

    /// Non-identifier properties, in mapping order.
    fn property_names(&self) -> Vec<String>;

    fn is_property_selectable(&self, index: usize) -> bool;

    /// Accepts `id` and dotted component paths.
    fn property_type(&self, path: &str) -> Option<PropertyType>;

    fn property_column_names(&self, path: &str) -> Vec<String>;

    fn property_column_aliases(&self, path: &str, suffix: &str) -> Vec<String>;

    fn property_aliases(&self, suffix: &str, index: usize) -> Vec<String>;

    fn select_fragment(&self, table_alias: &str, suffix: &str) -> String;
}

pub trait CollectionPersister: Debug + Send + Sync {
    /// `Owner.property`
    fn role(&self) -> &str;

    fn owner_entity_name(&self) -> &str;

    fn table_name(&self) -> &str;

    fn is_one_to_many(&self) -> bool;

    fn is_many_to_many(&self) -> bool;

    fn element_entity_name(&self) -> Option<&str>;

    fn has_index(&self) -> bool;

    fn key_column_names(&self) -> Vec<String>;

    fn index_column_names(&self) -> Vec<String>;

    fn element_column_names(&self) -> Vec<String>;

    fn key_column_aliases(&self, suffix: &str) -> Vec<String>;

    fn index_column_aliases(&self, suffix: &str) -> Vec<String>;

    fn element_column_aliases(&self, suffix: &str) -> Vec<String>;

    /// Aliases for the `key`, `index` or `element` pseudo-properties.
    fn collection_property_column_aliases(&self, property: &str, suffix: &str) -> Vec<String>;

    fn select_fragment(&self, table_alias: &str, suffix: &str) -> String;

    fn query_spaces(&self) -> Vec<String>;
}

pub trait MappingMetamodel: Debug + Send + Sync {
    fn find_entity(&self, name: &str) -> Option<Arc<dyn EntityPersister>>;

    fn find_collection(&self, role: &str) -> Option<Arc<dyn CollectionPersister>>;

    fn entity(&self, name: &str) -> Result<Arc<dyn EntityPersister>> {
        self.find_entity(name)
            .ok_or_else(|| QueryError::mapping(format!("Unknown entity [{}]", name)))
    }

    fn collection(&self, role: &str) -> Result<Arc<dyn CollectionPersister>> {
        self.find_collection(role)
            .ok_or_else(|| QueryError::mapping(format!("Unknown collection role [{}]", role)))
    }
}
