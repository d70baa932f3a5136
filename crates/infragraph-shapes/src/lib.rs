//! Shape-based validation for infragraph datasets.
//!
//! A [`ShapeSet`] declares per-class constraints: required attributes, datatypes,
//! enumerations, numeric ranges, relationship cardinality and object classes. Shapes
//! apply to every inferred instance of their target class.

mod constraints;
pub mod engine;
pub mod error;
pub mod report;
pub mod shape;

pub use engine::ValidationEngine;
pub use error::{Result, ShapeError};
pub use report::{ReportSummary, ResultValue, ValidationReport, ValidationResult};
pub use shape::{Constraint, ConstraintKind, Rule, Severity, Shape, ShapeSet};
