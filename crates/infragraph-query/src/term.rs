//! Result terms: IRIs (entities, classes, predicates) and literal values.

use infragraph_core::model::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A bound value in a query solution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Iri(String),
    Literal(Value),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(iri.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Iri(_) => None,
            Self::Literal(v) => Some(v),
        }
    }

    /// The IRI or the literal's lexical form.
    pub fn lexical_form(&self) -> String {
        match self {
            Self::Iri(iri) => iri.clone(),
            Self::Literal(v) => v.lexical_form(),
        }
    }

    /// ORDER BY comparison. Numeric literals sort before every other term and compare
    /// numerically; the rest compare by lexical form. This is a total order.
    pub fn order_cmp(&self, other: &Self) -> Ordering {
        let numeric = |t: &Self| t.as_literal().and_then(Value::as_f64);
        match (numeric(self), numeric(other)) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.lexical_form().cmp(&other.lexical_form()),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{}>", iri),
            Self::Literal(Value::String(s)) => write!(f, "\"{}\"", s),
            Self::Literal(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_order() {
        assert_eq!(Term::literal(9i64).order_cmp(&Term::literal(10i64)), Ordering::Less);
        assert_eq!(Term::literal(2.5).order_cmp(&Term::literal(2i64)), Ordering::Greater);
    }

    #[test]
    fn test_numbers_sort_before_other_terms() {
        let nine = Term::literal(9i64);
        let ten = Term::literal(10i64);
        let five = Term::literal("5");
        assert_eq!(nine.order_cmp(&ten), Ordering::Less);
        assert_eq!(ten.order_cmp(&five), Ordering::Less);
        assert_eq!(nine.order_cmp(&five), Ordering::Less);
        assert_eq!(five.order_cmp(&nine), Ordering::Greater);
        // Strings compare lexically, even when they look numeric.
        assert_eq!(Term::literal("10").order_cmp(&Term::literal("9")), Ordering::Less);
        assert_eq!(Term::iri("b").order_cmp(&Term::iri("a")), Ordering::Greater);
    }

    #[test]
    fn test_display() {
        assert_eq!(Term::iri("http://x#a").to_string(), "<http://x#a>");
        assert_eq!(Term::literal("up").to_string(), "\"up\"");
        assert_eq!(Term::literal(3i64).to_string(), "3");
    }
}
