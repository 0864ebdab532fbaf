//! Result set mappings and row materialization.

pub mod suffix;
pub use suffix::*;

pub mod result_builder;
pub use result_builder::*;

pub mod suffixed;
pub use suffixed::*;

pub mod result_set_mapping;
pub use result_set_mapping::*;

pub mod mapping_processor;
pub use mapping_processor::*;

pub mod row;
pub use row::*;

pub mod row_reader;
pub use row_reader::*;

pub mod result_shape;
pub use result_shape::*;
