use crate::criteria::{ArithmeticOperator, JsonExpression, Literal, Predicate, QueryPart, Window, XmlExpression};
use crate::parameter::QueryParameter;

/// `CASE` with conditions, or `CASE operand` comparing against values.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseExpression {
    Searched {
        whens: Vec<(Predicate, Expression)>,
        otherwise: Option<Box<Expression>>,
    },
    Simple {
        operand: Box<Expression>,
        whens: Vec<(Expression, Expression)>,
        otherwise: Option<Box<Expression>>,
    },
}

/// An aggregate or window function evaluated over a window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFunction {
    pub name: String,
    pub arguments: Vec<Expression>,
    pub filter: Option<Predicate>,
    pub window: Window,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Parameter(QueryParameter),
    /// `alias.attribute`; the attribute may be a dotted component path.
    Path {
        alias: String,
        attribute: String,
    },
    /// Attribute of a CTE, including its generated search and cycle columns.
    CteAttribute {
        alias: String,
        attribute: String,
    },
    Arithmetic {
        operator: ArithmeticOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Unary minus.
    Negated(Box<Expression>),
    Concat(Vec<Expression>),
    Function {
        name: String,
        arguments: Vec<Expression>,
    },
    Case(CaseExpression),
    Coalesce(Vec<Expression>),
    NullIf(Box<Expression>, Box<Expression>),
    Cast {
        expression: Box<Expression>,
        target_type: String,
    },
    Subquery(Box<QueryPart>),
    Window(Box<WindowFunction>),
    Json(Box<JsonExpression>),
    Xml(Box<XmlExpression>),
}

impl Expression {
    pub fn literal(value: impl Into<Literal>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn path(alias: &str, attribute: &str) -> Self {
        Expression::Path {
            alias: alias.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Expression::Parameter(_))
    }

    /// Whether the expression has to be parenthesized as an operand.
    pub fn is_compound(&self) -> bool {
        matches!(self, Expression::Arithmetic { .. } | Expression::Negated(_))
    }
}

impl From<Literal> for Expression {
    fn from(value: Literal) -> Self {
        Expression::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::criteria::{ArithmeticOperator, Expression, Literal};

    #[test]
    pub fn test_constructors() {
        assert_eq!(
            Expression::path("p", "address.city"),
            Expression::Path {
                alias: "p".to_string(),
                attribute: "address.city".to_string()
            }
        );
        assert_eq!(Expression::literal(3), Expression::Literal(Literal::Int(3)));
    }

    #[test]
    pub fn test_compound() {
        let sum = Expression::Arithmetic {
            operator: ArithmeticOperator::Add,
            left: Box::new(Expression::literal(1)),
            right: Box::new(Expression::literal(2)),
        };

        assert!(sum.is_compound());
        assert!(!Expression::literal(1).is_compound());
    }
}
