use std::fmt::{self, Display};

use crate::criteria::{Expression, SortSpecification};
use crate::{QueryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Rows,
    Range,
    Groups,
}

impl Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Rows => write!(f, "rows"),
            FrameKind::Range => write!(f, "range"),
            FrameKind::Groups => write!(f, "groups"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u32),
    CurrentRow,
    Following(u32),
    UnboundedFollowing,
}

impl FrameBound {
    /// Position relative to the current row, for ordering bounds.
    fn ordinal(self) -> (u8, i64) {
        match self {
            FrameBound::UnboundedPreceding => (0, 0),
            FrameBound::Preceding(n) => (1, -i64::from(n)),
            FrameBound::CurrentRow => (2, 0),
            FrameBound::Following(n) => (3, i64::from(n)),
            FrameBound::UnboundedFollowing => (4, 0),
        }
    }
}

impl Display for FrameBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameBound::UnboundedPreceding => write!(f, "unbounded preceding"),
            FrameBound::Preceding(n) => write!(f, "{} preceding", n),
            FrameBound::CurrentRow => write!(f, "current row"),
            FrameBound::Following(n) => write!(f, "{} following", n),
            FrameBound::UnboundedFollowing => write!(f, "unbounded following"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameExclusion {
    #[default]
    NoOthers,
    CurrentRow,
    Group,
    Ties,
}

impl Display for FrameExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameExclusion::NoOthers => write!(f, "exclude no others"),
            FrameExclusion::CurrentRow => write!(f, "exclude current row"),
            FrameExclusion::Group => write!(f, "exclude group"),
            FrameExclusion::Ties => write!(f, "exclude ties"),
        }
    }
}

/// A validated `rows | range | groups between .. and ..` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFrame {
    kind: FrameKind,
    start: FrameBound,
    end: FrameBound,
    exclusion: FrameExclusion,
}

impl WindowFrame {
    pub fn new(kind: FrameKind, start: FrameBound, end: FrameBound) -> Result<Self> {
        if start == FrameBound::UnboundedFollowing {
            return Err(QueryError::criteria("A window frame cannot start at UNBOUNDED FOLLOWING"));
        }
        if end == FrameBound::UnboundedPreceding {
            return Err(QueryError::criteria("A window frame cannot end at UNBOUNDED PRECEDING"));
        }
        if start.ordinal() > end.ordinal() {
            return Err(QueryError::criteria(format!(
                "Window frame start [{}] is after its end [{}]",
                start, end
            )));
        }
        Ok(Self {
            kind,
            start,
            end,
            exclusion: FrameExclusion::NoOthers,
        })
    }

    pub fn rows(start: FrameBound, end: FrameBound) -> Result<Self> {
        Self::new(FrameKind::Rows, start, end)
    }

    pub fn range(start: FrameBound, end: FrameBound) -> Result<Self> {
        Self::new(FrameKind::Range, start, end)
    }

    pub fn groups(start: FrameBound, end: FrameBound) -> Result<Self> {
        Self::new(FrameKind::Groups, start, end)
    }

    pub fn excluding(mut self, exclusion: FrameExclusion) -> Self {
        self.exclusion = exclusion;
        self
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn start(&self) -> FrameBound {
        self.start
    }

    pub fn end(&self) -> FrameBound {
        self.end
    }

    pub fn exclusion(&self) -> FrameExclusion {
        self.exclusion
    }
}

impl Display for WindowFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} between {} and {}", self.kind, self.start, self.end)?;
        if self.exclusion != FrameExclusion::NoOthers {
            write!(f, " {}", self.exclusion)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Window {
    pub partition_by: Vec<Expression>,
    pub order_by: Vec<SortSpecification>,
    pub frame: Option<WindowFrame>,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_by(mut self, expression: Expression) -> Self {
        self.partition_by.push(expression);
        self
    }

    pub fn order_by(mut self, sort: SortSpecification) -> Self {
        self.order_by.push(sort);
        self
    }

    pub fn frame(mut self, frame: WindowFrame) -> Self {
        self.frame = Some(frame);
        self
    }
}
