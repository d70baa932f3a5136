//! Core types and storage for infragraph.
//!
//! Provides the graph data model ([`model`]), the frozen [`store::GraphStore`], the
//! class hierarchy index ([`hierarchy::TypeHierarchy`]), the bulk [`load::Loader`], and
//! the [`Dataset`] that query and validation sessions share.

pub mod config;
pub mod dataset;
pub mod error;
pub mod hierarchy;
pub mod load;
pub mod model;
pub mod store;
pub mod vocab;

pub use dataset::Dataset;
pub use error::{GraphError, Result};
