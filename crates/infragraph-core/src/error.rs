//! Error types for loading and indexing the graph.

/// Result type for graph load and index operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised while building a [`Dataset`](crate::Dataset).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An edge or attribute names an entity that was never declared.
    #[error("referential integrity: {subject} -[{predicate}]-> references undeclared entity {missing}")]
    ReferentialIntegrity {
        subject: String,
        predicate: String,
        missing: String,
    },
    /// A subject was assigned two values for the same attribute.
    #[error("duplicate value for attribute {name} on {subject}")]
    DuplicateAttribute { subject: String, name: String },
    /// The subclass graph is not a DAG. `path` starts and ends on the same class.
    #[error("class hierarchy cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
    /// The load was cancelled between batches; no store was produced.
    #[error("load cancelled after {applied} record(s)")]
    LoadCancelled { applied: usize },
}
