//! Criteria query trees and their compilation to SQL.
//!
//! Nodes are plain values built through [`CriteriaBuilder`]; [`SqlRenderer`]
//! turns a [`CriteriaQuery`] into SQL text and the parameters behind its
//! markers.

pub mod literal;
pub use literal::*;

pub mod operators;
pub use operators::*;

pub mod expression;
pub use expression::*;

pub mod predicate;
pub use predicate::*;

pub mod order;
pub use order::*;

pub mod window;
pub use window::*;

pub mod from;
pub use from::*;

pub mod json;
pub use json::*;

pub mod xml;
pub use xml::*;

pub mod query;
pub use query::*;

pub mod cte;
pub use cte::*;

pub mod builder;
pub use builder::*;

pub mod renderer;
pub use renderer::*;
