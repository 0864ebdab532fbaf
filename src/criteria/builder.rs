use std::cell::Cell;

use crate::criteria::{
    ArithmeticOperator, CaseExpression, ComparisonOperator, CteCriteria, Expression, FromSource, InValues, Join,
    JoinTarget, JoinType, JsonExpression, Literal, Predicate, QueryPart, Root, SortSpecification, Window,
    WindowFunction, XmlExpression,
};
use crate::metamodel::MappingMetamodel;
use crate::parameter::QueryParameter;
use crate::{QueryError, Result};

/// Factory for criteria nodes.
///
/// The builder is the only context nodes are created through: it hands out
/// generated aliases and, when given a metamodel, checks entity names up
/// front. Nodes keep no reference back to it.
#[derive(Debug, Default)]
pub struct CriteriaBuilder<'a> {
    metamodel: Option<&'a dyn MappingMetamodel>,
    alias_counter: Cell<usize>,
}

impl<'a> CriteriaBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metamodel(metamodel: &'a dyn MappingMetamodel) -> Self {
        Self {
            metamodel: Some(metamodel),
            alias_counter: Cell::new(0),
        }
    }

    pub fn generate_alias(&self) -> String {
        let next = self.alias_counter.get() + 1;
        self.alias_counter.set(next);
        format!("alias_{}", next)
    }

    fn check_entity(&self, entity_name: &str) -> Result<String> {
        match self.metamodel {
            Some(metamodel) => Ok(metamodel.entity(entity_name)?.entity_name().to_string()),
            None => Ok(entity_name.to_string()),
        }
    }

    // from clause

    pub fn root(&self, entity_name: &str) -> Result<Root> {
        let alias = self.generate_alias();
        self.root_as(entity_name, &alias)
    }

    pub fn root_as(&self, entity_name: &str, alias: &str) -> Result<Root> {
        Ok(Root::new(FromSource::Entity(self.check_entity(entity_name)?), alias))
    }

    pub fn cte_root(&self, cte: &CteCriteria) -> Root {
        Root::new(FromSource::Cte(cte.name().to_string()), &self.generate_alias())
    }

    pub fn join(&self, parent_alias: &str, attribute: &str, join_type: JoinType) -> Join {
        let target = JoinTarget::Attribute {
            parent_alias: parent_alias.to_string(),
            attribute: attribute.to_string(),
        };
        Join::new(join_type, target, &self.generate_alias())
    }

    pub fn entity_join(&self, entity_name: &str, join_type: JoinType) -> Result<Join> {
        let target = JoinTarget::Entity(self.check_entity(entity_name)?);
        Ok(Join::new(join_type, target, &self.generate_alias()))
    }

    pub fn cte_join(&self, cte: &CteCriteria, join_type: JoinType) -> Join {
        Join::new(join_type, JoinTarget::Cte(cte.name().to_string()), &self.generate_alias())
    }

    // expressions

    pub fn literal(&self, value: impl Into<Literal>) -> Expression {
        Expression::Literal(value.into())
    }

    pub fn null_literal(&self) -> Expression {
        Expression::Literal(Literal::Null)
    }

    pub fn parameter(&self, name: &str) -> Expression {
        Expression::Parameter(QueryParameter::Named(name.to_string()))
    }

    pub fn positional(&self, position: u32) -> Expression {
        Expression::Parameter(QueryParameter::Ordinal(position))
    }

    /// Reference to an attribute of a root or join over `cte`.
    pub fn cte_attribute(&self, alias: &str, cte: &CteCriteria, attribute: &str) -> Result<Expression> {
        if !cte.exposes(attribute) {
            return Err(QueryError::criteria(format!(
                "CTE [{}] has no attribute [{}]",
                cte.name(),
                attribute
            )));
        }
        Ok(Expression::CteAttribute {
            alias: alias.to_string(),
            attribute: attribute.to_string(),
        })
    }

    fn arithmetic(&self, operator: ArithmeticOperator, left: Expression, right: Expression) -> Expression {
        Expression::Arithmetic {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn sum(&self, left: Expression, right: Expression) -> Expression {
        self.arithmetic(ArithmeticOperator::Add, left, right)
    }

    pub fn diff(&self, left: Expression, right: Expression) -> Expression {
        self.arithmetic(ArithmeticOperator::Subtract, left, right)
    }

    pub fn prod(&self, left: Expression, right: Expression) -> Expression {
        self.arithmetic(ArithmeticOperator::Multiply, left, right)
    }

    pub fn quot(&self, left: Expression, right: Expression) -> Expression {
        self.arithmetic(ArithmeticOperator::Divide, left, right)
    }

    pub fn modulo(&self, left: Expression, right: Expression) -> Expression {
        self.arithmetic(ArithmeticOperator::Modulo, left, right)
    }

    pub fn neg(&self, expression: Expression) -> Expression {
        Expression::Negated(Box::new(expression))
    }

    pub fn concat(&self, parts: Vec<Expression>) -> Expression {
        Expression::Concat(parts)
    }

    pub fn function(&self, name: &str, arguments: Vec<Expression>) -> Expression {
        Expression::Function {
            name: name.to_string(),
            arguments,
        }
    }

    pub fn count(&self, expression: Expression) -> Expression {
        self.function("count", vec![expression])
    }

    pub fn coalesce(&self, expressions: Vec<Expression>) -> Result<Expression> {
        if expressions.len() < 2 {
            return Err(QueryError::criteria("coalesce requires at least two arguments"));
        }
        Ok(Expression::Coalesce(expressions))
    }

    pub fn nullif(&self, left: Expression, right: Expression) -> Expression {
        Expression::NullIf(Box::new(left), Box::new(right))
    }

    pub fn cast(&self, expression: Expression, target_type: &str) -> Expression {
        Expression::Cast {
            expression: Box::new(expression),
            target_type: target_type.to_string(),
        }
    }

    pub fn select_case(
        &self,
        whens: Vec<(Predicate, Expression)>,
        otherwise: Option<Expression>,
    ) -> Result<Expression> {
        if whens.is_empty() {
            return Err(QueryError::criteria("A case expression needs at least one when clause"));
        }
        Ok(Expression::Case(CaseExpression::Searched {
            whens,
            otherwise: otherwise.map(Box::new),
        }))
    }

    pub fn simple_case(
        &self,
        operand: Expression,
        whens: Vec<(Expression, Expression)>,
        otherwise: Option<Expression>,
    ) -> Result<Expression> {
        if whens.is_empty() {
            return Err(QueryError::criteria("A case expression needs at least one when clause"));
        }
        Ok(Expression::Case(CaseExpression::Simple {
            operand: Box::new(operand),
            whens,
            otherwise: otherwise.map(Box::new),
        }))
    }

    pub fn subquery(&self, query: impl Into<QueryPart>) -> Expression {
        Expression::Subquery(Box::new(query.into()))
    }

    pub fn window_function(&self, name: &str, arguments: Vec<Expression>, window: Window) -> Expression {
        Expression::Window(Box::new(WindowFunction {
            name: name.to_string(),
            arguments,
            filter: None,
            window,
        }))
    }

    pub fn json(&self, expression: JsonExpression) -> Expression {
        Expression::Json(Box::new(expression))
    }

    pub fn xml(&self, expression: XmlExpression) -> Expression {
        Expression::Xml(Box::new(expression))
    }

    // predicates

    pub fn and(&self, predicates: Vec<Predicate>) -> Predicate {
        Predicate::and(predicates)
    }

    pub fn or(&self, predicates: Vec<Predicate>) -> Predicate {
        Predicate::or(predicates)
    }

    pub fn not(&self, predicate: Predicate) -> Predicate {
        predicate.not()
    }

    pub fn conjunction(&self) -> Predicate {
        Predicate::Constant(true)
    }

    pub fn disjunction(&self) -> Predicate {
        Predicate::Constant(false)
    }

    pub fn compare(&self, left: Expression, operator: ComparisonOperator, right: Expression) -> Predicate {
        Predicate::compare(left, operator, right)
    }

    pub fn equal(&self, left: Expression, right: Expression) -> Predicate {
        self.compare(left, ComparisonOperator::Equal, right)
    }

    pub fn not_equal(&self, left: Expression, right: Expression) -> Predicate {
        self.compare(left, ComparisonOperator::NotEqual, right)
    }

    pub fn less_than(&self, left: Expression, right: Expression) -> Predicate {
        self.compare(left, ComparisonOperator::LessThan, right)
    }

    pub fn greater_than(&self, left: Expression, right: Expression) -> Predicate {
        self.compare(left, ComparisonOperator::GreaterThan, right)
    }

    pub fn is_null(&self, expression: Expression) -> Predicate {
        Predicate::IsNull {
            expression,
            negated: false,
        }
    }

    pub fn is_not_null(&self, expression: Expression) -> Predicate {
        Predicate::IsNull {
            expression,
            negated: true,
        }
    }

    pub fn in_list(&self, expression: Expression, values: Vec<Expression>) -> Predicate {
        Predicate::In {
            expression,
            values: InValues::List(values),
            negated: false,
        }
    }

    pub fn in_subquery(&self, expression: Expression, query: impl Into<QueryPart>) -> Predicate {
        Predicate::In {
            expression,
            values: InValues::Subquery(Box::new(query.into())),
            negated: false,
        }
    }

    pub fn like(&self, expression: Expression, pattern: Expression, escape: Option<char>) -> Predicate {
        Predicate::Like {
            expression,
            pattern,
            escape,
            negated: false,
        }
    }

    pub fn between(&self, expression: Expression, lower: Expression, upper: Expression) -> Predicate {
        Predicate::Between {
            expression,
            lower,
            upper,
            negated: false,
        }
    }

    pub fn exists(&self, query: impl Into<QueryPart>) -> Predicate {
        Predicate::Exists {
            subquery: Box::new(query.into()),
            negated: false,
        }
    }

    pub fn is_true(&self, expression: Expression) -> Predicate {
        Predicate::BooleanExpression(expression)
    }

    // ordering

    pub fn asc(&self, expression: Expression) -> SortSpecification {
        SortSpecification::asc(expression)
    }

    pub fn desc(&self, expression: Expression) -> SortSpecification {
        SortSpecification::desc(expression)
    }
}
