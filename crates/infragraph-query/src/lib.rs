//! Graph-pattern queries over an infragraph [`Dataset`](infragraph_core::Dataset).
//!
//! Queries are structured values ([`query::Query`]) with triple patterns, property
//! paths (`^p`, `p1|p2`, `p+`, `p*`), OPTIONAL, UNION, FILTER membership tests, BIND,
//! COUNT, ORDER BY and LIMIT. Prefixes come from the [`engine::QueryContext`], never
//! from a global table.

pub mod engine;
pub mod error;
mod eval;
pub mod path;
pub mod prefix;
pub mod prepare;
pub mod query;
pub mod results;
pub mod term;

pub use engine::{QueryContext, QueryEngine};
pub use error::{QueryError, QuerySyntaxError, Result};
pub use path::PathExpr;
pub use prefix::PrefixMap;
pub use query::{Expr, FilterExpr, GroupPattern, Query, TermPattern, Var};
pub use results::QueryResults;
pub use term::Term;
