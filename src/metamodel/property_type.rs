use std::fmt::{self, Display};

/// Mapped type of an entity property, as far as result mapping cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    Basic { column_span: usize },
    Component(Vec<ComponentProperty>),
    ToOne {
        associated_entity: String,
        /// Table holding the foreign key columns.
        identifying_table: String,
        target_key_property: String,
    },
    Collection {
        role: String,
        /// Key property on the owning side; `None` means the owner's primary key.
        lhs_property: Option<String>,
    },
}

impl PropertyType {
    pub fn column_span(&self) -> usize {
        match self {
            PropertyType::Basic { column_span } => *column_span,
            PropertyType::Component(properties) => properties.iter().map(|p| p.property_type.column_span()).sum(),
            PropertyType::ToOne { .. } => 1,
            PropertyType::Collection { .. } => 0,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, PropertyType::Collection { .. })
    }

    pub fn uses_lhs_primary_key(&self) -> bool {
        matches!(self, PropertyType::Collection { lhs_property: None, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentProperty {
    pub name: String,
    pub property_type: PropertyType,
}

/// Name of a mapped type together with the origin that defined it. Two types
/// with the same name from different origins are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub name: String,
    pub origin: String,
}

impl TypeName {
    pub fn new(name: &str, origin: &str) -> Self {
        Self {
            name: name.to_string(),
            origin: origin.to_string(),
        }
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (origin: {})", self.name, self.origin)
    }
}
