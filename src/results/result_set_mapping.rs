use crate::results::{FetchReturn, ResultBuilder};

/// Describes how each row of a result set turns into a result value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSetMapping {
    name: Option<String>,
    builders: Vec<ResultBuilder>,
    legacy_fetches: Vec<FetchReturn>,
}

impl ResultSetMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn add_result_builder(&mut self, builder: ResultBuilder) {
        self.builders.push(builder);
    }

    pub fn add_legacy_fetch(&mut self, fetch: FetchReturn) {
        self.legacy_fetches.push(fetch);
    }

    pub fn builders(&self) -> &[ResultBuilder] {
        &self.builders
    }

    pub fn builders_mut(&mut self) -> &mut Vec<ResultBuilder> {
        &mut self.builders
    }

    pub fn legacy_fetches(&self) -> &[FetchReturn] {
        &self.legacy_fetches
    }

    pub fn legacy_fetches_mut(&mut self) -> &mut Vec<FetchReturn> {
        &mut self.legacy_fetches
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty() && self.legacy_fetches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.builders.iter().any(|b| b.table_alias() == Some(alias))
            || self.legacy_fetches.iter().any(|f| f.table_alias == alias)
    }

    /// Stable key for plan caching; equal mappings give equal identities.
    pub fn identity(&self) -> String {
        match &self.name {
            Some(name) => format!("named:{}", name),
            None => format!("{:?}|{:?}", self.builders, self.legacy_fetches),
        }
    }
}
