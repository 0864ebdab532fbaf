use std::fmt::{self, Display};

use crate::criteria::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

/// Explicit null placement; `None` leaves it to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPrecedence {
    #[default]
    None,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpecification {
    pub expression: Expression,
    pub direction: SortDirection,
    pub nulls: NullPrecedence,
}

impl SortSpecification {
    pub fn asc(expression: Expression) -> Self {
        Self {
            expression,
            direction: SortDirection::Ascending,
            nulls: NullPrecedence::None,
        }
    }

    pub fn desc(expression: Expression) -> Self {
        Self {
            expression,
            direction: SortDirection::Descending,
            nulls: NullPrecedence::None,
        }
    }

    pub fn nulls(mut self, nulls: NullPrecedence) -> Self {
        self.nulls = nulls;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.direction = self.direction.reversed();
        self
    }
}
