use crate::criteria::{BooleanOperator, ComparisonOperator, Expression, QueryPart};

/// Right-hand side of `IN`.
#[derive(Debug, Clone, PartialEq)]
pub enum InValues {
    List(Vec<Expression>),
    Subquery(Box<QueryPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// An empty AND is true, an empty OR is false.
    Junction {
        operator: BooleanOperator,
        predicates: Vec<Predicate>,
    },
    Comparison {
        left: Expression,
        operator: ComparisonOperator,
        right: Expression,
    },
    IsNull {
        expression: Expression,
        negated: bool,
    },
    In {
        expression: Expression,
        values: InValues,
        negated: bool,
    },
    Like {
        expression: Expression,
        pattern: Expression,
        escape: Option<char>,
        negated: bool,
    },
    Between {
        expression: Expression,
        lower: Expression,
        upper: Expression,
        negated: bool,
    },
    Exists {
        subquery: Box<QueryPart>,
        negated: bool,
    },
    /// A boolean-valued expression used as a condition.
    BooleanExpression(Expression),
    Constant(bool),
    /// Negation of a predicate with no negated form of its own.
    Negated(Box<Predicate>),
}

impl Predicate {
    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::Junction {
            operator: BooleanOperator::And,
            predicates,
        }
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Junction {
            operator: BooleanOperator::Or,
            predicates,
        }
    }

    pub fn compare(left: Expression, operator: ComparisonOperator, right: Expression) -> Self {
        Predicate::Comparison { left, operator, right }
    }

    /// Logical negation. Junctions follow De Morgan, comparisons flip their
    /// operator and flagged predicates toggle the flag, so negating twice
    /// gives back an equal predicate.
    pub fn not(self) -> Self {
        match self {
            Predicate::Junction { operator, predicates } => Predicate::Junction {
                operator: operator.negated(),
                predicates: predicates.into_iter().map(Predicate::not).collect(),
            },
            Predicate::Comparison { left, operator, right } => Predicate::Comparison {
                left,
                operator: operator.negated(),
                right,
            },
            Predicate::IsNull { expression, negated } => Predicate::IsNull {
                expression,
                negated: !negated,
            },
            Predicate::In {
                expression,
                values,
                negated,
            } => Predicate::In {
                expression,
                values,
                negated: !negated,
            },
            Predicate::Like {
                expression,
                pattern,
                escape,
                negated,
            } => Predicate::Like {
                expression,
                pattern,
                escape,
                negated: !negated,
            },
            Predicate::Between {
                expression,
                lower,
                upper,
                negated,
            } => Predicate::Between {
                expression,
                lower,
                upper,
                negated: !negated,
            },
            Predicate::Exists { subquery, negated } => Predicate::Exists {
                subquery,
                negated: !negated,
            },
            Predicate::Constant(value) => Predicate::Constant(!value),
            Predicate::Negated(inner) => *inner,
            other @ Predicate::BooleanExpression(_) => Predicate::Negated(Box::new(other)),
        }
    }

    pub fn is_negated(&self) -> bool {
        match self {
            Predicate::IsNull { negated, .. }
            | Predicate::In { negated, .. }
            | Predicate::Like { negated, .. }
            | Predicate::Between { negated, .. }
            | Predicate::Exists { negated, .. } => *negated,
            Predicate::Negated(_) => true,
            _ => false,
        }
    }

    /// Removes constant members from junctions; a junction decided by a
    /// constant collapses into that constant.
    pub fn fold_constants(self) -> Self {
        match self {
            Predicate::Junction { operator, predicates } => {
                // AND is decided by a false member, OR by a true one.
                let deciding = operator == BooleanOperator::Or;
                let mut out = Vec::with_capacity(predicates.len());
                for predicate in predicates {
                    match predicate.fold_constants() {
                        Predicate::Constant(value) if value == deciding => return Predicate::Constant(deciding),
                        Predicate::Constant(_) => {}
                        other => out.push(other),
                    }
                }
                match out.len() {
                    0 => Predicate::Constant(!deciding),
                    1 => out.remove(0),
                    _ => Predicate::Junction {
                        operator,
                        predicates: out,
                    },
                }
            }
            Predicate::Negated(inner) => match inner.fold_constants() {
                Predicate::Constant(value) => Predicate::Constant(!value),
                other => Predicate::Negated(Box::new(other)),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::criteria::{
        BooleanOperator, ComparisonOperator, Expression, InValues, Predicate, QueryPart, QuerySpec,
    };

    fn age() -> Expression {
        Expression::path("p", "age")
    }

    fn samples() -> Vec<Predicate> {
        let comparison = Predicate::compare(age(), ComparisonOperator::GreaterThan, Expression::literal(18));
        vec![
            comparison.clone(),
            Predicate::IsNull {
                expression: age(),
                negated: false,
            },
            Predicate::In {
                expression: age(),
                values: InValues::List(vec![Expression::literal(1), Expression::literal(2)]),
                negated: true,
            },
            Predicate::Like {
                expression: Expression::path("p", "name"),
                pattern: Expression::literal("A%"),
                escape: Some('\\'),
                negated: false,
            },
            Predicate::Between {
                expression: age(),
                lower: Expression::literal(1),
                upper: Expression::literal(9),
                negated: false,
            },
            Predicate::Exists {
                subquery: Box::new(QueryPart::Spec(Box::new(QuerySpec::default()))),
                negated: false,
            },
            Predicate::BooleanExpression(Expression::path("p", "active")),
            Predicate::Constant(true),
            Predicate::and(vec![comparison.clone(), Predicate::or(vec![comparison, Predicate::Constant(false)])]),
        ]
    }

    #[test]
    pub fn test_double_negation_is_identity() {
        for predicate in samples() {
            assert_eq!(predicate.clone().not().not(), predicate);
            assert_ne!(predicate.clone().not(), predicate);
        }
    }

    #[test]
    pub fn test_de_morgan() {
        let a = Predicate::compare(age(), ComparisonOperator::Equal, Expression::literal(1));
        let b = Predicate::IsNull {
            expression: age(),
            negated: false,
        };

        let negated = Predicate::and(vec![a, b]).not();

        match negated {
            Predicate::Junction { operator, predicates } => {
                assert_eq!(operator, BooleanOperator::Or);
                assert_eq!(
                    predicates[0],
                    Predicate::compare(age(), ComparisonOperator::NotEqual, Expression::literal(1))
                );
                assert!(predicates[1].is_negated());
            }
            other => panic!("expected a junction, got {:?}", other),
        }
    }

    #[test]
    pub fn test_fold_constants() {
        let comparison = Predicate::compare(age(), ComparisonOperator::LessThan, Expression::literal(3));

        assert_eq!(
            Predicate::and(vec![Predicate::Constant(true), comparison.clone()]).fold_constants(),
            comparison
        );
        assert_eq!(
            Predicate::and(vec![comparison.clone(), Predicate::Constant(false)]).fold_constants(),
            Predicate::Constant(false)
        );
        assert_eq!(
            Predicate::or(vec![Predicate::Constant(false), Predicate::or(vec![Predicate::Constant(true)])])
                .fold_constants(),
            Predicate::Constant(true)
        );
        assert_eq!(Predicate::or(vec![]).fold_constants(), Predicate::Constant(false));
        assert_eq!(
            Predicate::Negated(Box::new(Predicate::and(vec![]))).fold_constants(),
            Predicate::Constant(false)
        );
    }
}
