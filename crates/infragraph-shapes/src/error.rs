//! Shape set errors. These reject the shape set itself; findings about the data are
//! reported in a [`ValidationReport`](crate::report::ValidationReport) instead.

/// Result type for shape checking and validation.
pub type Result<T> = std::result::Result<T, ShapeError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("invalid constraint {constraint_id} on shape {shape_id}: {message}")]
    InvalidConstraint {
        shape_id: String,
        constraint_id: String,
        message: String,
    },
    /// A shape id repeats in the set, or a constraint id repeats within a shape.
    #[error("duplicate identifier {id}")]
    DuplicateId { id: String },
}
