//! Query errors.

/// Result type for query preparation and evaluation.
pub type Result<T> = std::result::Result<T, QueryError>;

/// A query that is malformed. Raised before evaluation begins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuerySyntaxError {
    #[error("unknown path operator '{operator}' at offset {offset} in `{path}`")]
    UnknownPathOperator {
        operator: char,
        offset: usize,
        path: String,
    },
    #[error("undeclared prefix '{prefix}:' in {iri}")]
    UndeclaredPrefix { prefix: String, iri: String },
    /// A FILTER or BIND reads a variable that no preceding pattern binds.
    #[error("?{var} is read by {clause} before any pattern binds it")]
    UnboundVariable { var: String, clause: &'static str },
    #[error("?{var} is already bound in this scope")]
    RebindVariable { var: String },
    /// A projected, ordered or counted variable appears nowhere in the pattern.
    #[error("?{var} in {clause} does not appear in the query pattern")]
    UnknownVariable { var: String, clause: &'static str },
    #[error("alternation with no branches")]
    EmptyAlternative,
    #[error("UNION with no branches")]
    EmptyUnion,
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Errors raised by [`QueryEngine`](crate::engine::QueryEngine).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query syntax error: {0}")]
    Syntax(#[from] QuerySyntaxError),
    /// The caller's deadline passed. No partial result is returned.
    #[error("query deadline exceeded")]
    DeadlineExceeded,
}
