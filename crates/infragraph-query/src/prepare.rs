//! Query preparation: prefix expansion, variable slot assignment, and scope checks.
//!
//! Everything that can make a query malformed is caught here, so evaluation never
//! sees an undeclared prefix or a variable read before it is bound.

use crate::error::QuerySyntaxError;
use crate::path::PathExpr;
use crate::prefix::PrefixMap;
use crate::query::{
    Element, Expr, FilterExpr, GroupPattern, PredicatePattern, Projection, Query, TermPattern,
    TriplePattern, Var,
};
use crate::term::Term;
use infragraph_core::vocab;
use std::collections::{BTreeSet, HashMap};

/// Index of a variable in a solution binding.
pub(crate) type Slot = usize;

#[derive(Debug, Clone)]
pub(crate) enum PlanTerm {
    Var(Slot),
    Const(Term),
}

/// A property path with every IRI expanded.
#[derive(Debug, Clone)]
pub(crate) enum PlanPath {
    Predicate(String),
    Inverse(Box<PlanPath>),
    Alternative(Vec<PlanPath>),
    OneOrMore(Box<PlanPath>),
    ZeroOrMore(Box<PlanPath>),
}

#[derive(Debug, Clone)]
pub(crate) enum PlanPredicate {
    Path { path: PlanPath, transitive: bool },
    Var(Slot),
}

#[derive(Debug, Clone)]
pub(crate) struct PlanTriple {
    pub subject: PlanTerm,
    pub predicate: PlanPredicate,
    pub object: PlanTerm,
    /// Set for `?x rdf:type C` with a constant class: matched through the hierarchy.
    pub inferred_class: Option<String>,
}

impl PlanTriple {
    pub fn is_transitive(&self) -> bool {
        matches!(
            self.predicate,
            PlanPredicate::Path {
                transitive: true,
                ..
            }
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) enum PlanExpr {
    Var(Slot),
    Const(Term),
    LocalName(Box<PlanExpr>),
}

#[derive(Debug, Clone)]
pub(crate) enum PlanFilter {
    In {
        expr: PlanExpr,
        set: Vec<PlanExpr>,
        negated: bool,
    },
    Bound(Slot),
    Not(Box<PlanFilter>),
}

#[derive(Debug, Clone)]
pub(crate) enum PlanElement {
    Triple(PlanTriple),
    Optional(PlanGroup),
    Union(Vec<PlanGroup>),
    Group(PlanGroup),
    Filter(PlanFilter),
    Bind { expr: PlanExpr, slot: Slot },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PlanGroup {
    pub elements: Vec<PlanElement>,
}

#[derive(Debug, Clone)]
pub(crate) enum PlanProjection {
    Vars(Vec<Slot>),
    Count {
        var: Option<Slot>,
        distinct: bool,
        alias: Slot,
    },
}

/// A validated query, ready to run against any dataset.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub(crate) slot_names: Vec<String>,
    pub(crate) pattern: PlanGroup,
    pub(crate) projection: PlanProjection,
    pub(crate) distinct: bool,
    pub(crate) order_by: Vec<Slot>,
    pub(crate) limit: Option<usize>,
}

impl PreparedQuery {
    /// Names of the projected variables, in result column order.
    pub fn variables(&self) -> Vec<&str> {
        self.projected_slots()
            .into_iter()
            .filter_map(|slot| self.slot_names.get(slot).map(String::as_str))
            .collect()
    }

    pub(crate) fn projected_slots(&self) -> Vec<Slot> {
        match &self.projection {
            PlanProjection::Vars(slots) => slots.clone(),
            PlanProjection::Count { alias, .. } => vec![*alias],
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slot_names.len()
    }
}

/// Validate `query` and expand its IRIs against `prefixes`.
pub fn prepare(query: &Query, prefixes: &PrefixMap) -> Result<PreparedQuery, QuerySyntaxError> {
    let mut preparer = Preparer {
        prefixes,
        slot_names: Vec::new(),
        slots: HashMap::new(),
    };
    let mut scope = BTreeSet::new();
    let pattern = preparer.group(&query.pattern, &mut scope)?;

    let projection = match &query.projection {
        Projection::Vars(vars) => PlanProjection::Vars(
            vars.iter()
                .map(|v| preparer.known(v, "SELECT"))
                .collect::<Result<_, _>>()?,
        ),
        Projection::All => PlanProjection::Vars((0..preparer.slot_names.len()).collect()),
        Projection::Count {
            var,
            distinct,
            alias,
        } => {
            let var = var
                .as_ref()
                .map(|v| preparer.known(v, "COUNT"))
                .transpose()?;
            if preparer.slots.contains_key(alias.name()) {
                return Err(QuerySyntaxError::RebindVariable {
                    var: alias.name().to_string(),
                });
            }
            PlanProjection::Count {
                var,
                distinct: *distinct,
                alias: preparer.slot(alias),
            }
        }
    };

    let order_by: Vec<Slot> = query
        .order_by
        .iter()
        .map(|v| preparer.known(v, "ORDER BY"))
        .collect::<Result<_, _>>()?;

    tracing::debug!(
        variables = preparer.slot_names.len(),
        elements = query.pattern.elements.len(),
        "query prepared"
    );

    Ok(PreparedQuery {
        slot_names: preparer.slot_names,
        pattern,
        projection,
        distinct: query.distinct,
        order_by,
        limit: query.limit,
    })
}

struct Preparer<'a> {
    prefixes: &'a PrefixMap,
    slot_names: Vec<String>,
    slots: HashMap<String, Slot>,
}

impl Preparer<'_> {
    /// Slot for a variable, allocating one on first sight.
    fn slot(&mut self, var: &Var) -> Slot {
        if let Some(&slot) = self.slots.get(var.name()) {
            return slot;
        }
        let slot = self.slot_names.len();
        self.slot_names.push(var.name().to_string());
        self.slots.insert(var.name().to_string(), slot);
        slot
    }

    fn known(&self, var: &Var, clause: &'static str) -> Result<Slot, QuerySyntaxError> {
        self.slots
            .get(var.name())
            .copied()
            .ok_or_else(|| QuerySyntaxError::UnknownVariable {
                var: var.name().to_string(),
                clause,
            })
    }

    fn in_scope(
        &self,
        var: &Var,
        scope: &BTreeSet<Slot>,
        clause: &'static str,
    ) -> Result<Slot, QuerySyntaxError> {
        match self.slots.get(var.name()) {
            Some(slot) if scope.contains(slot) => Ok(*slot),
            _ => Err(QuerySyntaxError::UnboundVariable {
                var: var.name().to_string(),
                clause,
            }),
        }
    }

    fn group(
        &mut self,
        group: &GroupPattern,
        scope: &mut BTreeSet<Slot>,
    ) -> Result<PlanGroup, QuerySyntaxError> {
        let mut elements = Vec::with_capacity(group.elements.len());
        for element in &group.elements {
            let planned = match element {
                Element::Triple(triple) => PlanElement::Triple(self.triple(triple, scope)?),
                Element::Optional(inner) => {
                    let mut inner_scope = scope.clone();
                    let planned = self.group(inner, &mut inner_scope)?;
                    scope.extend(inner_scope);
                    PlanElement::Optional(planned)
                }
                Element::Union(branches) => {
                    if branches.is_empty() {
                        return Err(QuerySyntaxError::EmptyUnion);
                    }
                    let mut bound = BTreeSet::new();
                    let mut planned = Vec::with_capacity(branches.len());
                    for branch in branches {
                        let mut branch_scope = scope.clone();
                        planned.push(self.group(branch, &mut branch_scope)?);
                        bound.extend(branch_scope);
                    }
                    scope.extend(bound);
                    PlanElement::Union(planned)
                }
                Element::Group(inner) => PlanElement::Group(self.group(inner, scope)?),
                Element::Filter(filter) => PlanElement::Filter(self.filter(filter, scope)?),
                Element::Bind { expr, var } => {
                    let expr = self.expr(expr, scope, "BIND")?;
                    if self.slots.get(var.name()).is_some_and(|s| scope.contains(s)) {
                        return Err(QuerySyntaxError::RebindVariable {
                            var: var.name().to_string(),
                        });
                    }
                    let slot = self.slot(var);
                    scope.insert(slot);
                    PlanElement::Bind { expr, slot }
                }
            };
            elements.push(planned);
        }
        Ok(PlanGroup { elements })
    }

    fn triple(
        &mut self,
        triple: &TriplePattern,
        scope: &mut BTreeSet<Slot>,
    ) -> Result<PlanTriple, QuerySyntaxError> {
        let subject = self.term(&triple.subject, scope)?;
        let predicate = match &triple.predicate {
            PredicatePattern::Path(path) => PlanPredicate::Path {
                path: self.path(path)?,
                transitive: path.is_transitive(),
            },
            PredicatePattern::Var(var) => {
                let slot = self.slot(var);
                scope.insert(slot);
                PlanPredicate::Var(slot)
            }
        };
        let object = self.term(&triple.object, scope)?;

        let inferred_class = match (&predicate, &object) {
            (
                PlanPredicate::Path {
                    path: PlanPath::Predicate(p),
                    ..
                },
                PlanTerm::Const(Term::Iri(class)),
            ) if p == vocab::RDF_TYPE => Some(class.clone()),
            _ => None,
        };

        Ok(PlanTriple {
            subject,
            predicate,
            object,
            inferred_class,
        })
    }

    fn term(
        &mut self,
        term: &TermPattern,
        scope: &mut BTreeSet<Slot>,
    ) -> Result<PlanTerm, QuerySyntaxError> {
        Ok(match term {
            TermPattern::Var(var) => {
                let slot = self.slot(var);
                scope.insert(slot);
                PlanTerm::Var(slot)
            }
            TermPattern::Iri(iri) => PlanTerm::Const(Term::Iri(self.prefixes.expand(iri)?)),
            TermPattern::Literal(value) => PlanTerm::Const(Term::Literal(value.clone())),
        })
    }

    fn path(&self, path: &PathExpr) -> Result<PlanPath, QuerySyntaxError> {
        Ok(match path {
            PathExpr::Predicate(iri) => PlanPath::Predicate(self.prefixes.expand(iri)?),
            PathExpr::Inverse(inner) => PlanPath::Inverse(Box::new(self.path(inner)?)),
            PathExpr::Alternative(branches) => {
                if branches.is_empty() {
                    return Err(QuerySyntaxError::EmptyAlternative);
                }
                PlanPath::Alternative(
                    branches
                        .iter()
                        .map(|b| self.path(b))
                        .collect::<Result<_, _>>()?,
                )
            }
            PathExpr::OneOrMore(inner) => PlanPath::OneOrMore(Box::new(self.path(inner)?)),
            PathExpr::ZeroOrMore(inner) => PlanPath::ZeroOrMore(Box::new(self.path(inner)?)),
        })
    }

    fn expr(
        &self,
        expr: &Expr,
        scope: &BTreeSet<Slot>,
        clause: &'static str,
    ) -> Result<PlanExpr, QuerySyntaxError> {
        Ok(match expr {
            Expr::Var(var) => PlanExpr::Var(self.in_scope(var, scope, clause)?),
            Expr::Iri(iri) => PlanExpr::Const(Term::Iri(self.prefixes.expand(iri)?)),
            Expr::Literal(value) => PlanExpr::Const(Term::Literal(value.clone())),
            Expr::LocalName(inner) => {
                PlanExpr::LocalName(Box::new(self.expr(inner, scope, clause)?))
            }
        })
    }

    fn filter(
        &self,
        filter: &FilterExpr,
        scope: &BTreeSet<Slot>,
    ) -> Result<PlanFilter, QuerySyntaxError> {
        const CLAUSE: &str = "FILTER";
        Ok(match filter {
            FilterExpr::In { expr, set } | FilterExpr::NotIn { expr, set } => PlanFilter::In {
                expr: self.expr(expr, scope, CLAUSE)?,
                set: set
                    .iter()
                    .map(|e| self.expr(e, scope, CLAUSE))
                    .collect::<Result<_, _>>()?,
                negated: matches!(filter, FilterExpr::NotIn { .. }),
            },
            FilterExpr::Bound(var) => PlanFilter::Bound(self.in_scope(var, scope, CLAUSE)?),
            FilterExpr::Not(inner) => PlanFilter::Not(Box::new(self.filter(inner, scope)?)),
        })
    }
}
