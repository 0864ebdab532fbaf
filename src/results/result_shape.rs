use crate::metamodel::TypeName;
use crate::parameter::BindValue;
use crate::results::ResultValue;
use crate::{QueryError, Result};

/// What a row reader produces for each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    /// No result builders; every selected column is returned.
    Dynamic,
    Scalar,
    Entity(TypeName),
    Collection,
    Instantiation { target: String },
    Tuple(usize),
}

/// Result type requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ResultType {
    #[default]
    Any,
    Tuple,
    Scalar,
    Entity(TypeName),
    /// Rows are passed to a constructor of `target`; `constructor_arities`
    /// lists the argument counts it accepts.
    Instantiation {
        target: String,
        constructor_arities: Vec<usize>,
    },
}

impl ResultType {
    pub fn instantiation(target: &str, constructor_arities: &[usize]) -> Self {
        ResultType::Instantiation {
            target: target.to_string(),
            constructor_arities: constructor_arities.to_vec(),
        }
    }

    /// Checks that rows of `shape` can be returned as this type.
    pub fn validate(&self, shape: &ResultShape) -> Result<()> {
        match (self, shape) {
            (ResultType::Any, _) | (ResultType::Tuple, _) | (_, ResultShape::Dynamic) => Ok(()),
            (ResultType::Scalar, ResultShape::Scalar) => Ok(()),
            (ResultType::Entity(expected), ResultShape::Entity(actual)) => {
                if expected == actual {
                    Ok(())
                } else if expected.name == actual.name {
                    Err(QueryError::shape(format!(
                        "Result type [{}] was loaded from origin [{}] but the query returns [{}] from origin [{}]",
                        expected.name, expected.origin, actual.name, actual.origin
                    )))
                } else {
                    Err(mismatch(self, shape))
                }
            }
            (ResultType::Instantiation { target, .. }, ResultShape::Instantiation { target: actual }) => {
                if target == actual {
                    Ok(())
                } else {
                    Err(mismatch(self, shape))
                }
            }
            (ResultType::Instantiation { .. }, ResultShape::Scalar) => self.check_arity(1),
            (ResultType::Instantiation { .. }, ResultShape::Tuple(width)) => self.check_arity(*width),
            _ => Err(mismatch(self, shape)),
        }
    }

    fn check_arity(&self, width: usize) -> Result<()> {
        match self {
            ResultType::Instantiation { target, constructor_arities } if !constructor_arities.contains(&width) => {
                Err(QueryError::shape(format!(
                    "No constructor of [{}] accepts {} arguments",
                    target, width
                )))
            }
            _ => Ok(()),
        }
    }

    /// Converts one read row to this type; only instantiations change the value.
    pub fn apply(&self, value: ResultValue) -> Result<ResultValue> {
        let ResultType::Instantiation { target, .. } = self else {
            return Ok(value);
        };
        let arguments: Vec<BindValue> = match value {
            ResultValue::Instantiation { .. } => return Ok(value),
            ResultValue::Null => vec![BindValue::Null],
            ResultValue::Scalar(v) => vec![v],
            ResultValue::Tuple(values) => values
                .into_iter()
                .map(|v| match v {
                    ResultValue::Null => Ok(BindValue::Null),
                    ResultValue::Scalar(v) => Ok(v),
                    other => Err(QueryError::shape(format!(
                        "Cannot pass {:?} as a constructor argument of [{}]",
                        other, target
                    ))),
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(QueryError::shape(format!(
                    "Cannot instantiate [{}] from {:?}",
                    target, other
                )));
            }
        };
        self.check_arity(arguments.len())?;
        Ok(ResultValue::Instantiation {
            target: target.clone(),
            arguments,
        })
    }
}

fn mismatch(expected: &ResultType, shape: &ResultShape) -> QueryError {
    QueryError::shape(format!(
        "Result type {:?} is not compatible with the query result {:?}",
        expected, shape
    ))
}
