//! Structured query representation.
//!
//! Queries are built in code (or deserialized from JSON) rather than parsed from a
//! textual query language. IRIs may stay prefixed; they are expanded against the
//! [`PrefixMap`](crate::prefix::PrefixMap) of the execution context.

use crate::path::PathExpr;
use infragraph_core::model::Value;
use infragraph_core::vocab;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A query variable, stored without its leading `?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Var(String);

impl Var {
    /// Accepts `"x"` or `"?x"`.
    pub fn new(name: &str) -> Self {
        Self(name.strip_prefix('?').unwrap_or(name).to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// An IRI as written in a query: full, or `prefix:local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IriRef {
    Full(String),
    Prefixed { prefix: String, local: String },
}

impl IriRef {
    pub fn full(iri: impl Into<String>) -> Self {
        Self::Full(iri.into())
    }

    /// Parse `<iri>`, a bare absolute IRI containing `://`, the keyword `a`, or
    /// `prefix:local`. Anything without a colon is a local name in the default prefix.
    pub fn parse(text: &str) -> Self {
        if let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return Self::Full(inner.to_string());
        }
        if text.contains("://") {
            return Self::Full(text.to_string());
        }
        if text == "a" {
            return Self::Full(vocab::RDF_TYPE.to_string());
        }
        match text.split_once(':') {
            Some((prefix, local)) => Self::Prefixed {
                prefix: prefix.to_string(),
                local: local.to_string(),
            },
            None => Self::Prefixed {
                prefix: String::new(),
                local: text.to_string(),
            },
        }
    }
}

impl fmt::Display for IriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(iri) => write!(f, "<{}>", iri),
            Self::Prefixed { prefix, local } => write!(f, "{}:{}", prefix, local),
        }
    }
}

/// Subject or object position of a triple pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermPattern {
    Var(Var),
    Iri(IriRef),
    Literal(Value),
}

impl TermPattern {
    pub fn var(name: &str) -> Self {
        Self::Var(Var::new(name))
    }

    pub fn iri(text: &str) -> Self {
        Self::Iri(IriRef::parse(text))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }
}

/// Predicate position: a property path or a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicatePattern {
    Path(PathExpr),
    Var(Var),
}

impl From<PathExpr> for PredicatePattern {
    fn from(path: PathExpr) -> Self {
        Self::Path(path)
    }
}

impl From<Var> for PredicatePattern {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub predicate: PredicatePattern,
    pub object: TermPattern,
}

impl TriplePattern {
    pub fn new(
        subject: TermPattern,
        predicate: impl Into<PredicatePattern>,
        object: TermPattern,
    ) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

/// A value expression used by FILTER and BIND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Var(Var),
    Iri(IriRef),
    Literal(Value),
    /// The suffix after the last `#` or `/` of an IRI or string literal.
    LocalName(Box<Expr>),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Self::Var(Var::new(name))
    }

    pub fn iri(text: &str) -> Self {
        Self::Iri(IriRef::parse(text))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn local_name(inner: Expr) -> Self {
        Self::LocalName(Box::new(inner))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpr {
    In { expr: Expr, set: Vec<Expr> },
    NotIn { expr: Expr, set: Vec<Expr> },
    Bound(Var),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn is_in(expr: Expr, set: impl IntoIterator<Item = Expr>) -> Self {
        Self::In {
            expr,
            set: set.into_iter().collect(),
        }
    }

    pub fn not_in(expr: Expr, set: impl IntoIterator<Item = Expr>) -> Self {
        Self::NotIn {
            expr,
            set: set.into_iter().collect(),
        }
    }

    pub fn bound(name: &str) -> Self {
        Self::Bound(Var::new(name))
    }

    pub fn not(inner: FilterExpr) -> Self {
        Self::Not(Box::new(inner))
    }
}

/// One element of a group, evaluated left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Triple(TriplePattern),
    Optional(GroupPattern),
    Union(Vec<GroupPattern>),
    Group(GroupPattern),
    Filter(FilterExpr),
    Bind { expr: Expr, var: Var },
}

/// An ordered list of pattern elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupPattern {
    pub elements: Vec<Element>,
}

impl GroupPattern {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn triple(
        mut self,
        subject: TermPattern,
        predicate: impl Into<PredicatePattern>,
        object: TermPattern,
    ) -> Self {
        self.elements.push(Element::Triple(TriplePattern::new(
            subject, predicate, object,
        )));
        self
    }

    #[must_use]
    pub fn optional(mut self, group: GroupPattern) -> Self {
        self.elements.push(Element::Optional(group));
        self
    }

    #[must_use]
    pub fn union(mut self, branches: impl IntoIterator<Item = GroupPattern>) -> Self {
        self.elements
            .push(Element::Union(branches.into_iter().collect()));
        self
    }

    #[must_use]
    pub fn group(mut self, group: GroupPattern) -> Self {
        self.elements.push(Element::Group(group));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: FilterExpr) -> Self {
        self.elements.push(Element::Filter(filter));
        self
    }

    #[must_use]
    pub fn bind(mut self, expr: Expr, var: &str) -> Self {
        self.elements.push(Element::Bind {
            expr,
            var: Var::new(var),
        });
        self
    }
}

/// What a query returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    Vars(Vec<Var>),
    /// Every pattern variable, in order of first appearance.
    All,
    /// A single row binding `alias` to the number of solutions. With `var`, only
    /// solutions where it is bound count.
    Count {
        var: Option<Var>,
        distinct: bool,
        alias: Var,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub projection: Projection,
    #[serde(default)]
    pub distinct: bool,
    pub pattern: GroupPattern,
    #[serde(default)]
    pub order_by: Vec<Var>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    pub fn select<'a>(vars: impl IntoIterator<Item = &'a str>) -> Self {
        Self::with_projection(Projection::Vars(vars.into_iter().map(Var::new).collect()))
    }

    pub fn select_all() -> Self {
        Self::with_projection(Projection::All)
    }

    pub fn count(var: Option<&str>, distinct: bool, alias: &str) -> Self {
        Self::with_projection(Projection::Count {
            var: var.map(Var::new),
            distinct,
            alias: Var::new(alias),
        })
    }

    fn with_projection(projection: Projection) -> Self {
        Self {
            projection,
            distinct: false,
            pattern: GroupPattern::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: GroupPattern) -> Self {
        self.pattern = pattern;
        self
    }

    #[must_use]
    pub fn order_by<'a>(mut self, vars: impl IntoIterator<Item = &'a str>) -> Self {
        self.order_by = vars.into_iter().map(Var::new).collect();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_strips_question_mark() {
        assert_eq!(Var::new("?x"), Var::new("x"));
        assert_eq!(Var::new("x").to_string(), "?x");
    }

    #[test]
    fn test_iri_ref_parse() {
        assert_eq!(
            IriRef::parse(":app1"),
            IriRef::Prefixed {
                prefix: String::new(),
                local: "app1".into()
            }
        );
        assert_eq!(
            IriRef::parse("rdfs:subClassOf"),
            IriRef::Prefixed {
                prefix: "rdfs".into(),
                local: "subClassOf".into()
            }
        );
        assert_eq!(IriRef::parse("a"), IriRef::full(vocab::RDF_TYPE));
        assert_eq!(
            IriRef::parse("http://example.org/x"),
            IriRef::full("http://example.org/x")
        );
    }

    #[test]
    fn test_query_json_shape() {
        let query = Query::select(["x"])
            .pattern(GroupPattern::new().filter(FilterExpr::bound("x")))
            .limit(3);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["projection"]["vars"][0], "x");
        assert_eq!(json["pattern"][0]["filter"]["bound"], "x");
        let back: Query = serde_json::from_value(json).unwrap();
        assert_eq!(back, query);
    }
}
