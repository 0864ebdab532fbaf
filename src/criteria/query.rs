use std::fmt::{self, Display};

use crate::criteria::{CteCriteria, Expression, Predicate, Root, SortSpecification};
use crate::{QueryError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub expression: Expression,
    pub alias: Option<String>,
}

impl Selection {
    pub fn new(expression: Expression) -> Self {
        Self { expression, alias: None }
    }

    pub fn aliased(expression: Expression, alias: &str) -> Self {
        Self {
            expression,
            alias: Some(alias.to_string()),
        }
    }
}

/// One `select .. from .. where .. group by .. having ..` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    pub distinct: bool,
    pub selections: Vec<Selection>,
    pub roots: Vec<Root>,
    pub restriction: Option<Predicate>,
    pub group_by: Vec<Expression>,
    pub having: Option<Predicate>,
    pub order_by: Vec<SortSpecification>,
    pub offset: Option<Expression>,
    pub fetch: Option<Expression>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selections.push(selection);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from(mut self, root: Root) -> Self {
        self.roots.push(root);
        self
    }

    /// Further restrictions are and-ed with the existing one.
    pub fn restrict(mut self, predicate: Predicate) -> Self {
        self.restriction = Some(match self.restriction.take() {
            Some(existing) => Predicate::and(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    pub fn group_by(mut self, expression: Expression) -> Self {
        self.group_by.push(expression);
        self
    }

    pub fn having(mut self, predicate: Predicate) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => Predicate::and(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    pub fn order_by(mut self, sort: SortSpecification) -> Self {
        self.order_by.push(sort);
        self
    }

    pub fn offset(mut self, offset: Expression) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn fetch(mut self, fetch: Expression) -> Self {
        self.fetch = Some(fetch);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOperator::Union => write!(f, "union"),
            SetOperator::UnionAll => write!(f, "union all"),
            SetOperator::Intersect => write!(f, "intersect"),
            SetOperator::IntersectAll => write!(f, "intersect all"),
            SetOperator::Except => write!(f, "except"),
            SetOperator::ExceptAll => write!(f, "except all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryPart {
    Spec(Box<QuerySpec>),
    SetOperation {
        operator: SetOperator,
        left: Box<QueryPart>,
        right: Box<QueryPart>,
    },
}

impl QueryPart {
    /// Combines two parts; both must select the same number of columns.
    pub fn combine(operator: SetOperator, left: QueryPart, right: QueryPart) -> Result<Self> {
        let (lhs, rhs) = (left.select_width(), right.select_width());
        if lhs != rhs {
            return Err(QueryError::criteria(format!(
                "Operands of {} select {} and {} columns",
                operator, lhs, rhs
            )));
        }
        Ok(QueryPart::SetOperation {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn select_width(&self) -> usize {
        match self {
            QueryPart::Spec(spec) => spec.selections.len(),
            QueryPart::SetOperation { left, .. } => left.select_width(),
        }
    }

    /// Left-most query spec, the one defining result column names.
    pub fn first_spec(&self) -> &QuerySpec {
        match self {
            QueryPart::Spec(spec) => spec,
            QueryPart::SetOperation { left, .. } => left.first_spec(),
        }
    }
}

impl From<QuerySpec> for QueryPart {
    fn from(spec: QuerySpec) -> Self {
        QueryPart::Spec(Box::new(spec))
    }
}

/// A complete criteria statement: CTEs, a body and the outer ordering and
/// row window.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaQuery {
    ctes: Vec<CteCriteria>,
    body: QueryPart,
    order_by: Vec<SortSpecification>,
    offset: Option<Expression>,
    fetch: Option<Expression>,
}

impl CriteriaQuery {
    pub fn new(body: impl Into<QueryPart>) -> Self {
        Self {
            ctes: Vec::new(),
            body: body.into(),
            order_by: Vec::new(),
            offset: None,
            fetch: None,
        }
    }

    pub fn with_cte(mut self, cte: CteCriteria) -> Result<Self> {
        if self.find_cte(cte.name()).is_some() {
            return Err(QueryError::criteria(format!(
                "A CTE named [{}] is already defined",
                cte.name()
            )));
        }
        self.ctes.push(cte);
        Ok(self)
    }

    pub fn order_by(mut self, sort: SortSpecification) -> Self {
        self.order_by.push(sort);
        self
    }

    pub fn offset(mut self, offset: Expression) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn fetch(mut self, fetch: Expression) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn find_cte(&self, name: &str) -> Option<&CteCriteria> {
        self.ctes.iter().find(|c| c.name() == name)
    }

    pub fn ctes(&self) -> &[CteCriteria] {
        &self.ctes
    }

    pub fn body(&self) -> &QueryPart {
        &self.body
    }

    pub fn sort_specifications(&self) -> &[SortSpecification] {
        &self.order_by
    }

    pub fn offset_expression(&self) -> Option<&Expression> {
        self.offset.as_ref()
    }

    pub fn fetch_expression(&self) -> Option<&Expression> {
        self.fetch.as_ref()
    }
}
