use indexmap::IndexMap;

use crate::metamodel::{
    column_alias, select_fragment_of, ComponentProperty, EntityPersister, PropertyType, TypeName,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Basic,
    Embedded(Vec<AttributeMapping>),
    ToOne {
        target_entity: String,
        join_table: Option<String>,
        target_key_property: String,
    },
    Collection {
        role: String,
        lhs_property: Option<String>,
    },
}

/// One mapped attribute and the columns that hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMapping {
    pub name: String,
    pub kind: AttributeKind,
    pub columns: Vec<String>,
    pub selectable: bool,
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

impl AttributeMapping {
    pub fn basic(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Basic,
            columns: owned(columns),
            selectable: true,
        }
    }

    pub fn embedded(name: &str, parts: Vec<AttributeMapping>) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Embedded(parts),
            columns: Vec::new(),
            selectable: true,
        }
    }

    pub fn to_one(name: &str, target_entity: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::ToOne {
                target_entity: target_entity.to_string(),
                join_table: None,
                target_key_property: "id".to_string(),
            },
            columns: owned(columns),
            selectable: true,
        }
    }

    /// To-one whose foreign key lives in `join_table` rather than the owner's table.
    pub fn to_one_via_join_table(
        name: &str,
        target_entity: &str,
        join_table: &str,
        columns: &[&str],
        target_key_property: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::ToOne {
                target_entity: target_entity.to_string(),
                join_table: Some(join_table.to_string()),
                target_key_property: target_key_property.to_string(),
            },
            columns: owned(columns),
            selectable: true,
        }
    }

    pub fn collection(name: &str, role: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Collection {
                role: role.to_string(),
                lhs_property: None,
            },
            columns: Vec::new(),
            selectable: true,
        }
    }

    /// Collection keyed by a non-identifier property of the owner.
    pub fn collection_keyed_by(name: &str, role: &str, lhs_property: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Collection {
                role: role.to_string(),
                lhs_property: Some(lhs_property.to_string()),
            },
            columns: Vec::new(),
            selectable: true,
        }
    }

    pub fn not_selectable(mut self) -> Self {
        self.selectable = false;
        self
    }

    /// Columns in declaration order, flattening embedded parts.
    pub fn all_columns(&self) -> Vec<String> {
        match &self.kind {
            AttributeKind::Embedded(parts) => parts.iter().flat_map(|p| p.all_columns()).collect(),
            AttributeKind::Collection { .. } => Vec::new(),
            _ => self.columns.clone(),
        }
    }

    fn in_owner_table(&self) -> bool {
        !matches!(
            self.kind,
            AttributeKind::Collection { .. } | AttributeKind::ToOne { join_table: Some(_), .. }
        )
    }

    fn find(&self, path: &[&str]) -> Option<&AttributeMapping> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => match &self.kind {
                AttributeKind::Embedded(parts) => parts.iter().find(|p| p.name == *head)?.find(rest),
                _ => None,
            },
        }
    }

    fn property_type(&self, owner_table: &str) -> PropertyType {
        match &self.kind {
            AttributeKind::Basic => PropertyType::Basic { column_span: self.columns.len() },
            AttributeKind::Embedded(parts) => PropertyType::Component(
                parts
                    .iter()
                    .map(|p| ComponentProperty {
                        name: p.name.clone(),
                        property_type: p.property_type(owner_table),
                    })
                    .collect(),
            ),
            AttributeKind::ToOne { target_entity, join_table, target_key_property } => PropertyType::ToOne {
                associated_entity: target_entity.clone(),
                identifying_table: join_table.clone().unwrap_or_else(|| owner_table.to_string()),
                target_key_property: target_key_property.clone(),
            },
            AttributeKind::Collection { role, lhs_property } => PropertyType::Collection {
                role: role.clone(),
                lhs_property: lhs_property.clone(),
            },
        }
    }
}

/// In-memory entity mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMapping {
    entity_name: String,
    origin: String,
    table: String,
    identifier: Option<AttributeMapping>,
    discriminator: Option<String>,
    attributes: IndexMap<String, AttributeMapping>,
    column_indexes: IndexMap<String, usize>,
}

impl EntityMapping {
    pub fn new(entity_name: &str, table: &str) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            origin: "default".to_string(),
            table: table.to_string(),
            identifier: None,
            discriminator: None,
            attributes: IndexMap::new(),
            column_indexes: IndexMap::new(),
        }
    }

    pub fn origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    pub fn id(mut self, name: &str, columns: &[&str]) -> Self {
        let id = AttributeMapping::basic(name, columns);
        self.register_columns(&id.all_columns());
        self.identifier = Some(id);
        self
    }

    pub fn discriminator(mut self, column: &str) -> Self {
        self.register_columns(&[column.to_string()]);
        self.discriminator = Some(column.to_string());
        self
    }

    pub fn basic(self, name: &str, columns: &[&str]) -> Self {
        self.attribute(AttributeMapping::basic(name, columns))
    }

    pub fn attribute(mut self, attribute: AttributeMapping) -> Self {
        self.register_columns(&attribute.all_columns());
        self.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    fn register_columns(&mut self, columns: &[String]) {
        for column in columns {
            let next = self.column_indexes.len();
            self.column_indexes.entry(column.clone()).or_insert(next);
        }
    }

    fn aliases_of(&self, columns: &[String], suffix: &str) -> Vec<String> {
        columns
            .iter()
            .map(|c| format!("{}{}", column_alias(c, self.column_indexes.get(c).copied().unwrap_or(0)), suffix))
            .collect()
    }

    fn find_attribute(&self, path: &str) -> Option<&AttributeMapping> {
        if let Some(id) = &self.identifier {
            if path == id.name || path == "id" {
                return Some(id);
            }
        }
        let parts: Vec<&str> = path.split('.').collect();
        let (head, rest) = parts.split_first()?;
        self.attributes.get(*head)?.find(rest)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeMapping> {
        self.attributes.values()
    }

    fn own_table_columns(&self) -> Vec<String> {
        let mut columns = self.identifier_column_names();
        columns.extend(self.discriminator.clone());
        for attribute in self.attributes.values() {
            if attribute.selectable && attribute.in_owner_table() {
                columns.extend(attribute.all_columns());
            }
        }
        columns
    }
}

impl EntityPersister for EntityMapping {
    fn entity_name(&self) -> &str {
        &self.entity_name
    }

    fn type_name(&self) -> TypeName {
        TypeName::new(&self.entity_name, &self.origin)
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn query_spaces(&self) -> Vec<String> {
        let mut spaces = vec![self.table.clone()];
        for attribute in self.attributes.values() {
            if let AttributeKind::ToOne { join_table: Some(table), .. } = &attribute.kind {
                if !spaces.contains(table) {
                    spaces.push(table.clone());
                }
            }
        }
        spaces
    }

    fn identifier_property_name(&self) -> Option<&str> {
        self.identifier.as_ref().map(|id| id.name.as_str())
    }

    fn identifier_column_names(&self) -> Vec<String> {
        self.identifier.as_ref().map(|id| id.all_columns()).unwrap_or_default()
    }

    fn identifier_aliases(&self, suffix: &str) -> Vec<String> {
        self.aliases_of(&self.identifier_column_names(), suffix)
    }

    fn discriminator_column_name(&self) -> Option<String> {
        self.discriminator.clone()
    }

    fn discriminator_alias(&self, suffix: &str) -> Option<String> {
        let column = self.discriminator.as_ref()?;
        self.aliases_of(std::slice::from_ref(column), suffix).pop()
    }

    fn property_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    fn is_property_selectable(&self, index: usize) -> bool {
        self.attributes.get_index(index).is_some_and(|(_, a)| a.selectable)
    }

    fn property_type(&self, path: &str) -> Option<PropertyType> {
        self.find_attribute(path).map(|a| a.property_type(&self.table))
    }

    fn property_column_names(&self, path: &str) -> Vec<String> {
        self.find_attribute(path).map(|a| a.all_columns()).unwrap_or_default()
    }

    fn property_column_aliases(&self, path: &str, suffix: &str) -> Vec<String> {
        self.aliases_of(&self.property_column_names(path), suffix)
    }

    fn property_aliases(&self, suffix: &str, index: usize) -> Vec<String> {
        match self.attributes.get_index(index) {
            Some((_, attribute)) => self.aliases_of(&attribute.all_columns(), suffix),
            None => Vec::new(),
        }
    }

    fn select_fragment(&self, table_alias: &str, suffix: &str) -> String {
        let columns = self.own_table_columns();
        let aliases = self.aliases_of(&columns, suffix);
        select_fragment_of(table_alias, &columns, &aliases)
    }
}
