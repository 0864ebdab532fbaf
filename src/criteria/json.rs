use std::fmt::{self, Display};

use crate::criteria::{Expression, Predicate, SortSpecification};

/// `null|error|empty|default .. on empty|error`
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonBehavior {
    #[default]
    Unspecified,
    Null,
    Error,
    EmptyArray,
    EmptyObject,
    Default(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonWrapper {
    #[default]
    Without,
    With,
    Conditional,
}

impl Display for JsonWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonWrapper::Without => write!(f, "without wrapper"),
            JsonWrapper::With => write!(f, "with wrapper"),
            JsonWrapper::Conditional => write!(f, "with conditional wrapper"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonNullClause {
    #[default]
    NullOnNull,
    AbsentOnNull,
}

impl Display for JsonNullClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonNullClause::NullOnNull => write!(f, "null on null"),
            JsonNullClause::AbsentOnNull => write!(f, "absent on null"),
        }
    }
}

/// SQL/JSON functions over a document expression and a path literal.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonExpression {
    Value {
        document: Expression,
        path: String,
        returning: Option<String>,
        on_empty: JsonBehavior,
        on_error: JsonBehavior,
    },
    Query {
        document: Expression,
        path: String,
        wrapper: JsonWrapper,
        on_empty: JsonBehavior,
        on_error: JsonBehavior,
    },
    Exists {
        document: Expression,
        path: String,
        on_error: JsonBehavior,
    },
    Object {
        entries: Vec<(String, Expression)>,
        nulls: JsonNullClause,
    },
    Array {
        elements: Vec<Expression>,
        nulls: JsonNullClause,
    },
    ArrayAgg {
        value: Expression,
        nulls: JsonNullClause,
        order_by: Vec<SortSpecification>,
        filter: Option<Predicate>,
    },
    ObjectAgg {
        key: Expression,
        value: Expression,
        nulls: JsonNullClause,
        filter: Option<Predicate>,
    },
}

impl JsonExpression {
    pub fn value(document: Expression, path: &str) -> Self {
        JsonExpression::Value {
            document,
            path: path.to_string(),
            returning: None,
            on_empty: JsonBehavior::Unspecified,
            on_error: JsonBehavior::Unspecified,
        }
    }

    pub fn query(document: Expression, path: &str) -> Self {
        JsonExpression::Query {
            document,
            path: path.to_string(),
            wrapper: JsonWrapper::Without,
            on_empty: JsonBehavior::Unspecified,
            on_error: JsonBehavior::Unspecified,
        }
    }

    pub fn exists(document: Expression, path: &str) -> Self {
        JsonExpression::Exists {
            document,
            path: path.to_string(),
            on_error: JsonBehavior::Unspecified,
        }
    }

    pub fn object(entries: Vec<(&str, Expression)>) -> Self {
        JsonExpression::Object {
            entries: entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            nulls: JsonNullClause::NullOnNull,
        }
    }

    pub fn array(elements: Vec<Expression>) -> Self {
        JsonExpression::Array {
            elements,
            nulls: JsonNullClause::NullOnNull,
        }
    }

    pub fn array_agg(value: Expression) -> Self {
        JsonExpression::ArrayAgg {
            value,
            nulls: JsonNullClause::NullOnNull,
            order_by: Vec::new(),
            filter: None,
        }
    }

    pub fn object_agg(key: Expression, value: Expression) -> Self {
        JsonExpression::ObjectAgg {
            key,
            value,
            nulls: JsonNullClause::NullOnNull,
            filter: None,
        }
    }

    /// Only meaningful for `json_value`; ignored elsewhere.
    pub fn returning(mut self, type_name: &str) -> Self {
        if let JsonExpression::Value { returning, .. } = &mut self {
            *returning = Some(type_name.to_string());
        }
        self
    }

    pub fn wrapper(mut self, mode: JsonWrapper) -> Self {
        if let JsonExpression::Query { wrapper, .. } = &mut self {
            *wrapper = mode;
        }
        self
    }

    pub fn on_empty(mut self, behavior: JsonBehavior) -> Self {
        match &mut self {
            JsonExpression::Value { on_empty, .. } | JsonExpression::Query { on_empty, .. } => *on_empty = behavior,
            _ => {}
        }
        self
    }

    pub fn on_error(mut self, behavior: JsonBehavior) -> Self {
        match &mut self {
            JsonExpression::Value { on_error, .. }
            | JsonExpression::Query { on_error, .. }
            | JsonExpression::Exists { on_error, .. } => *on_error = behavior,
            _ => {}
        }
        self
    }

    pub fn absent_on_null(mut self) -> Self {
        match &mut self {
            JsonExpression::Object { nulls, .. }
            | JsonExpression::Array { nulls, .. }
            | JsonExpression::ArrayAgg { nulls, .. }
            | JsonExpression::ObjectAgg { nulls, .. } => *nulls = JsonNullClause::AbsentOnNull,
            _ => {}
        }
        self
    }

    pub fn order_by(mut self, sort: SortSpecification) -> Self {
        if let JsonExpression::ArrayAgg { order_by, .. } = &mut self {
            order_by.push(sort);
        }
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        match &mut self {
            JsonExpression::ArrayAgg { filter, .. } | JsonExpression::ObjectAgg { filter, .. } => {
                *filter = Some(predicate)
            }
            _ => {}
        }
        self
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, JsonExpression::ArrayAgg { .. } | JsonExpression::ObjectAgg { .. })
    }
}
