//! Query solutions.

use crate::term::Term;
use serde::{Deserialize, Serialize};

/// Owned query output: one column per projected variable, `None` where unbound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResults {
    pub variables: Vec<String>,
    pub rows: Vec<Vec<Option<Term>>>,
}

impl QueryResults {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column position of a variable (`"x"` or `"?x"`).
    pub fn column_index(&self, var: &str) -> Option<usize> {
        let name = var.strip_prefix('?').unwrap_or(var);
        self.variables.iter().position(|v| v == name)
    }

    pub fn get(&self, row: usize, var: &str) -> Option<&Term> {
        let col = self.column_index(var)?;
        self.rows.get(row)?.get(col)?.as_ref()
    }

    /// Every row's value for `var`, in row order.
    pub fn column(&self, var: &str) -> Vec<Option<&Term>> {
        match self.column_index(var) {
            Some(col) => self
                .rows
                .iter()
                .map(|row| row.get(col).and_then(Option::as_ref))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The IRIs bound to `var`, skipping unbound cells and literals.
    pub fn iris(&self, var: &str) -> Vec<&str> {
        self.column(var)
            .into_iter()
            .filter_map(|t| t.and_then(Term::as_iri))
            .collect()
    }
}
