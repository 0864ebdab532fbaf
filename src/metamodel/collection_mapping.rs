use crate::metamodel::{column_alias, select_fragment_of, CollectionPersister};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionNature {
    /// Elements are entities whose table holds the key columns.
    OneToMany,
    /// Elements are entities linked through a join table.
    ManyToMany,
    /// Elements are basic values in a collection table.
    Element,
}

/// In-memory collection mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMapping {
    role: String,
    owner_entity: String,
    table: String,
    nature: CollectionNature,
    element_entity: Option<String>,
    key_columns: Vec<String>,
    index_columns: Vec<String>,
    element_columns: Vec<String>,
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

impl CollectionMapping {
    /// `element_table` is the element entity's table, which holds `key_columns`.
    pub fn one_to_many(
        role: &str,
        element_entity: &str,
        element_table: &str,
        key_columns: &[&str],
        element_id_columns: &[&str],
    ) -> Self {
        Self {
            role: role.to_string(),
            owner_entity: owner_of(role),
            table: element_table.to_string(),
            nature: CollectionNature::OneToMany,
            element_entity: Some(element_entity.to_string()),
            key_columns: owned(key_columns),
            index_columns: Vec::new(),
            element_columns: owned(element_id_columns),
        }
    }

    pub fn many_to_many(
        role: &str,
        element_entity: &str,
        join_table: &str,
        key_columns: &[&str],
        element_columns: &[&str],
    ) -> Self {
        Self {
            role: role.to_string(),
            owner_entity: owner_of(role),
            table: join_table.to_string(),
            nature: CollectionNature::ManyToMany,
            element_entity: Some(element_entity.to_string()),
            key_columns: owned(key_columns),
            index_columns: Vec::new(),
            element_columns: owned(element_columns),
        }
    }

    pub fn elements(role: &str, table: &str, key_columns: &[&str], element_columns: &[&str]) -> Self {
        Self {
            role: role.to_string(),
            owner_entity: owner_of(role),
            table: table.to_string(),
            nature: CollectionNature::Element,
            element_entity: None,
            key_columns: owned(key_columns),
            index_columns: Vec::new(),
            element_columns: owned(element_columns),
        }
    }

    pub fn with_index(mut self, index_columns: &[&str]) -> Self {
        self.index_columns = owned(index_columns);
        self
    }

    pub fn nature(&self) -> CollectionNature {
        self.nature
    }

    fn all_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        for column in self.key_columns.iter().chain(&self.index_columns).chain(&self.element_columns) {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        columns
    }

    fn aliases_of(&self, columns: &[String], suffix: &str) -> Vec<String> {
        let all = self.all_columns();
        columns
            .iter()
            .map(|c| {
                let index = all.iter().position(|a| a == c).unwrap_or(0);
                format!("{}{}", column_alias(c, index), suffix)
            })
            .collect()
    }
}

fn owner_of(role: &str) -> String {
    match role.rfind('.') {
        Some(dot) => role[..dot].to_string(),
        None => role.to_string(),
    }
}

impl CollectionPersister for CollectionMapping {
    fn role(&self) -> &str {
        &self.role
    }

    fn owner_entity_name(&self) -> &str {
        &self.owner_entity
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn is_one_to_many(&self) -> bool {
        self.nature == CollectionNature::OneToMany
    }

    fn is_many_to_many(&self) -> bool {
        self.nature == CollectionNature::ManyToMany
    }

    fn element_entity_name(&self) -> Option<&str> {
        self.element_entity.as_deref()
    }

    fn has_index(&self) -> bool {
        !self.index_columns.is_empty()
    }

    fn key_column_names(&self) -> Vec<String> {
        self.key_columns.clone()
    }

    fn index_column_names(&self) -> Vec<String> {
        self.index_columns.clone()
    }

    fn element_column_names(&self) -> Vec<String> {
        self.element_columns.clone()
    }

    fn key_column_aliases(&self, suffix: &str) -> Vec<String> {
        self.aliases_of(&self.key_columns, suffix)
    }

    fn index_column_aliases(&self, suffix: &str) -> Vec<String> {
        self.aliases_of(&self.index_columns, suffix)
    }

    fn element_column_aliases(&self, suffix: &str) -> Vec<String> {
        self.aliases_of(&self.element_columns, suffix)
    }

    fn collection_property_column_aliases(&self, property: &str, suffix: &str) -> Vec<String> {
        match property {
            "key" => self.key_column_aliases(suffix),
            "index" => self.index_column_aliases(suffix),
            "element" => self.element_column_aliases(suffix),
            _ => Vec::new(),
        }
    }

    fn select_fragment(&self, table_alias: &str, suffix: &str) -> String {
        let columns = self.all_columns();
        let aliases = self.aliases_of(&columns, suffix);
        select_fragment_of(table_alias, &columns, &aliases)
    }

    fn query_spaces(&self) -> Vec<String> {
        vec![self.table.clone()]
    }
}
