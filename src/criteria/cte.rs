use std::fmt::{self, Display};

use crate::criteria::{Literal, QueryPart};
use crate::{QueryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CteMaterialization {
    #[default]
    Undefined,
    Materialized,
    NotMaterialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    BreadthFirst,
    DepthFirst,
}

impl Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchKind::BreadthFirst => write!(f, "breadth first"),
            SearchKind::DepthFirst => write!(f, "depth first"),
        }
    }
}

/// `search breadth|depth first by .. set ..` of a recursive CTE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CteSearchClause {
    pub kind: SearchKind,
    pub by: Vec<String>,
    pub set_attribute: String,
}

/// `cycle .. set mark to .. default .. using path` of a recursive CTE.
#[derive(Debug, Clone, PartialEq)]
pub struct CteCycleClause {
    pub attributes: Vec<String>,
    pub mark_attribute: String,
    pub path_attribute: Option<String>,
    pub cycle_value: Literal,
    pub no_cycle_value: Literal,
}

impl CteCycleClause {
    pub fn new(attributes: &[&str], mark_attribute: &str) -> Self {
        Self {
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            mark_attribute: mark_attribute.to_string(),
            path_attribute: None,
            cycle_value: Literal::Bool(true),
            no_cycle_value: Literal::Bool(false),
        }
    }

    pub fn using_path(mut self, path_attribute: &str) -> Self {
        self.path_attribute = Some(path_attribute.to_string());
        self
    }

    pub fn values(mut self, cycle_value: Literal, no_cycle_value: Literal) -> Self {
        self.cycle_value = cycle_value;
        self.no_cycle_value = no_cycle_value;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CteCriteria {
    name: String,
    attributes: Vec<String>,
    definition: QueryPart,
    recursive: bool,
    materialization: CteMaterialization,
    search: Option<CteSearchClause>,
    cycle: Option<CteCycleClause>,
}

impl CteCriteria {
    /// The attributes name the columns of the definition's select list.
    pub fn new(name: &str, attributes: &[&str], definition: QueryPart) -> Result<Self> {
        let width = definition.select_width();
        if width != attributes.len() {
            return Err(QueryError::criteria(format!(
                "CTE [{}] declares {} attributes but its definition selects {}",
                name,
                attributes.len(),
                width
            )));
        }
        let mut seen: Vec<&str> = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            if seen.contains(attribute) {
                return Err(QueryError::criteria(format!(
                    "Duplicate attribute [{}] in CTE [{}]",
                    attribute, name
                )));
            }
            seen.push(attribute);
        }
        Ok(Self {
            name: name.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            definition,
            recursive: false,
            materialization: CteMaterialization::Undefined,
            search: None,
            cycle: None,
        })
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    pub fn materialization(mut self, materialization: CteMaterialization) -> Self {
        self.materialization = materialization;
        self
    }

    pub fn search(mut self, kind: SearchKind, by: &[&str], set_attribute: &str) -> Result<Self> {
        self.require_recursive("search")?;
        for attribute in by {
            self.require_attribute(attribute)?;
        }
        self.require_fresh(set_attribute)?;
        self.search = Some(CteSearchClause {
            kind,
            by: by.iter().map(|a| a.to_string()).collect(),
            set_attribute: set_attribute.to_string(),
        });
        Ok(self)
    }

    pub fn cycle(mut self, clause: CteCycleClause) -> Result<Self> {
        self.require_recursive("cycle")?;
        for attribute in &clause.attributes {
            self.require_attribute(attribute)?;
        }
        self.require_fresh(&clause.mark_attribute)?;
        if let Some(path) = &clause.path_attribute {
            if path == &clause.mark_attribute {
                return Err(QueryError::criteria(format!(
                    "Cycle mark and path of CTE [{}] are both named [{}]",
                    self.name, path
                )));
            }
            self.require_fresh(path)?;
        }
        self.cycle = Some(clause);
        Ok(self)
    }

    fn require_recursive(&self, clause: &str) -> Result<()> {
        if self.recursive {
            Ok(())
        } else {
            Err(QueryError::criteria(format!(
                "A {} clause requires CTE [{}] to be recursive",
                clause, self.name
            )))
        }
    }

    fn require_attribute(&self, attribute: &str) -> Result<()> {
        if self.attributes.iter().any(|a| a == attribute) {
            Ok(())
        } else {
            Err(QueryError::criteria(format!(
                "CTE [{}] has no attribute [{}]",
                self.name, attribute
            )))
        }
    }

    /// Generated columns may not shadow a declared attribute or each other.
    fn require_fresh(&self, attribute: &str) -> Result<()> {
        let taken = self.attributes.iter().any(|a| a == attribute)
            || self.search.as_ref().is_some_and(|s| s.set_attribute == attribute)
            || self.cycle.as_ref().is_some_and(|c| {
                c.mark_attribute == attribute || c.path_attribute.as_deref() == Some(attribute)
            });
        if taken {
            Err(QueryError::criteria(format!(
                "Attribute [{}] is already defined on CTE [{}]",
                attribute, self.name
            )))
        } else {
            Ok(())
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn definition(&self) -> &QueryPart {
        &self.definition
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn get_materialization(&self) -> CteMaterialization {
        self.materialization
    }

    pub fn search_clause(&self) -> Option<&CteSearchClause> {
        self.search.as_ref()
    }

    pub fn cycle_clause(&self) -> Option<&CteCycleClause> {
        self.cycle.as_ref()
    }

    /// Whether `attribute` can be referenced through a root over this CTE,
    /// including generated search and cycle columns.
    pub fn exposes(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
            || self.search.as_ref().is_some_and(|s| s.set_attribute == attribute)
            || self.cycle.as_ref().is_some_and(|c| {
                c.mark_attribute == attribute || c.path_attribute.as_deref() == Some(attribute)
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::criteria::{CteCriteria, CteCycleClause, Expression, QueryPart, QuerySpec, SearchKind, Selection};
    use crate::QueryError;

    fn definition() -> QueryPart {
        QueryPart::Spec(Box::new(QuerySpec {
            selections: vec![
                Selection::new(Expression::path("e", "id")),
                Selection::new(Expression::path("e", "manager")),
            ],
            ..QuerySpec::default()
        }))
    }

    #[test]
    pub fn test_attribute_count_must_match() {
        let result = CteCriteria::new("tree", &["id"], definition());

        assert!(matches!(result, Err(QueryError::Criteria(_))));
    }

    #[test]
    pub fn test_search_and_cycle() {
        let cte = CteCriteria::new("tree", &["id", "manager"], definition())
            .unwrap()
            .recursive()
            .search(SearchKind::DepthFirst, &["id"], "ord")
            .unwrap()
            .cycle(CteCycleClause::new(&["id"], "is_cycle").using_path("path"))
            .unwrap();

        assert!(cte.exposes("ord"));
        assert!(cte.exposes("is_cycle"));
        assert!(cte.exposes("path"));
        assert!(!cte.exposes("depth"));
    }

    #[test]
    pub fn test_generated_attributes_cannot_collide() {
        let cte = CteCriteria::new("tree", &["id", "manager"], definition()).unwrap().recursive();

        assert!(cte.clone().search(SearchKind::BreadthFirst, &["id"], "manager").is_err());
        assert!(cte.clone().search(SearchKind::BreadthFirst, &["missing"], "ord").is_err());
        assert!(cte
            .clone()
            .search(SearchKind::BreadthFirst, &["id"], "ord")
            .unwrap()
            .cycle(CteCycleClause::new(&["id"], "ord"))
            .is_err());
        assert!(cte.cycle(CteCycleClause::new(&["id"], "mark").using_path("mark")).is_err());
    }

    #[test]
    pub fn test_clauses_require_recursion() {
        let cte = CteCriteria::new("tree", &["id", "manager"], definition()).unwrap();

        assert!(cte.search(SearchKind::DepthFirst, &["id"], "ord").is_err());
    }
}
