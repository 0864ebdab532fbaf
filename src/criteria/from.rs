use std::fmt::{self, Display};

use crate::criteria::{Expression, Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "join"),
            JoinType::Left => write!(f, "left join"),
            JoinType::Right => write!(f, "right join"),
            JoinType::Full => write!(f, "full join"),
            JoinType::Cross => write!(f, "cross join"),
        }
    }
}

/// What a root selects from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FromSource {
    Entity(String),
    Cte(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTarget {
    /// An association attribute of an already joined alias.
    Attribute { parent_alias: String, attribute: String },
    /// Ad hoc join to an unrelated entity; needs an explicit condition.
    Entity(String),
    Cte(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub target: JoinTarget,
    pub alias: String,
    pub on: Option<Predicate>,
    pub fetch: bool,
    pub joins: Vec<Join>,
}

impl Join {
    pub fn new(join_type: JoinType, target: JoinTarget, alias: &str) -> Self {
        Self {
            join_type,
            target,
            alias: alias.to_string(),
            on: None,
            fetch: false,
            joins: Vec::new(),
        }
    }

    /// Adds a restriction; attribute joins keep their mapped condition too.
    pub fn on(mut self, predicate: Predicate) -> Self {
        self.on = Some(match self.on.take() {
            Some(existing) => Predicate::and(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    pub fn fetch(mut self) -> Self {
        self.fetch = true;
        self
    }

    pub fn with_join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn path(&self, attribute: &str) -> Expression {
        Expression::path(&self.alias, attribute)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub source: FromSource,
    pub alias: String,
    pub joins: Vec<Join>,
}

impl Root {
    pub fn new(source: FromSource, alias: &str) -> Self {
        Self {
            source,
            alias: alias.to_string(),
            joins: Vec::new(),
        }
    }

    pub fn with_join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn path(&self, attribute: &str) -> Expression {
        Expression::path(&self.alias, attribute)
    }

    /// Every alias introduced by the root and its joins, depth first.
    pub fn aliases(&self) -> Vec<&str> {
        fn collect<'a>(joins: &'a [Join], out: &mut Vec<&'a str>) {
            for join in joins {
                out.push(&join.alias);
                collect(&join.joins, out);
            }
        }

        let mut out = vec![self.alias.as_str()];
        collect(&self.joins, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::criteria::{
        ComparisonOperator, Expression, FromSource, Join, JoinTarget, JoinType, Predicate, Root,
    };

    #[test]
    pub fn test_aliases_are_collected_depth_first() {
        let root = Root::new(FromSource::Entity("Person".to_string()), "p")
            .with_join(
                Join::new(
                    JoinType::Left,
                    JoinTarget::Attribute {
                        parent_alias: "p".to_string(),
                        attribute: "employer".to_string(),
                    },
                    "c",
                )
                .with_join(Join::new(JoinType::Inner, JoinTarget::Entity("Phone".to_string()), "ph")),
            )
            .with_join(Join::new(JoinType::Cross, JoinTarget::Cte("tree".to_string()), "t"));

        assert_eq!(root.aliases(), vec!["p", "c", "ph", "t"]);
    }

    #[test]
    pub fn test_on_accumulates() {
        let first = Predicate::compare(Expression::path("c", "id"), ComparisonOperator::Equal, Expression::literal(1));
        let second = Predicate::IsNull {
            expression: Expression::path("c", "name"),
            negated: true,
        };

        let join = Join::new(JoinType::Inner, JoinTarget::Entity("Company".to_string()), "c")
            .on(first.clone())
            .on(second.clone());

        assert_eq!(join.on, Some(Predicate::and(vec![first, second])));
        assert_eq!(join.path("name"), Expression::path("c", "name"));
    }
}
