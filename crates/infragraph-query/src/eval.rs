//! Nested-loop evaluation of prepared queries.
//!
//! Solutions are slot vectors. Each group element maps the current solution list to a
//! new one, left to right. Property paths are walked breadth-first with a visited set,
//! so transitive operators terminate on cyclic graphs.

use crate::error::{QueryError, Result};
use crate::prepare::{
    PlanElement, PlanExpr, PlanFilter, PlanGroup, PlanPath, PlanPredicate, PlanProjection,
    PlanTerm, PlanTriple, PreparedQuery, Slot,
};
use crate::results::QueryResults;
use crate::term::Term;
use infragraph_core::Dataset;
use infragraph_core::config::QueryConfig;
use infragraph_core::model::Value;
use infragraph_core::vocab;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

type Binding = Vec<Option<Term>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn flip(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

pub(crate) struct Evaluator<'a> {
    pub dataset: &'a Dataset,
    pub config: &'a QueryConfig,
    pub deadline: Option<Instant>,
}

impl Evaluator<'_> {
    pub fn run(&self, prepared: &PreparedQuery) -> Result<QueryResults> {
        let initial = vec![vec![None; prepared.slot_count()]];
        let solutions = self.group(&prepared.pattern, initial)?;

        let mut rows = match &prepared.projection {
            PlanProjection::Vars(_) => solutions,
            PlanProjection::Count {
                var,
                distinct,
                alias,
            } => {
                let count = count_solutions(&solutions, *var, *distinct);
                let mut row = vec![None; prepared.slot_count()];
                if let Some(cell) = row.get_mut(*alias) {
                    *cell = Some(Term::Literal(Value::Integer(
                        i64::try_from(count).unwrap_or(i64::MAX),
                    )));
                }
                vec![row]
            }
        };

        if !prepared.order_by.is_empty() {
            // Stable: ties keep evaluation order.
            rows.sort_by(|a, b| compare_rows(a, b, &prepared.order_by));
        }

        let columns = prepared.projected_slots();
        let mut projected: Vec<Vec<Option<Term>>> = rows
            .into_iter()
            .map(|row| columns.iter().map(|&s| value(&row, s).cloned()).collect())
            .collect();

        if prepared.distinct {
            let mut seen = HashSet::new();
            projected.retain(|row| seen.insert(row.clone()));
        }
        if let Some(limit) = prepared.limit {
            projected.truncate(limit);
        }

        Ok(QueryResults {
            variables: prepared
                .variables()
                .into_iter()
                .map(String::from)
                .collect(),
            rows: projected,
        })
    }

    fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(QueryError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    fn group(&self, group: &PlanGroup, input: Vec<Binding>) -> Result<Vec<Binding>> {
        let mut current = input;
        for element in &group.elements {
            self.check_deadline()?;
            if current.is_empty() {
                break;
            }
            current = match element {
                PlanElement::Triple(triple) => self.triple(triple, &current)?,
                PlanElement::Optional(inner) => {
                    let mut out = Vec::with_capacity(current.len());
                    for binding in current {
                        let matched = self.group(inner, vec![binding.clone()])?;
                        if matched.is_empty() {
                            out.push(binding);
                        } else {
                            out.extend(matched);
                        }
                    }
                    out
                }
                PlanElement::Union(branches) => {
                    let mut out = Vec::new();
                    for binding in &current {
                        for branch in branches {
                            out.extend(self.group(branch, vec![binding.clone()])?);
                        }
                    }
                    out
                }
                PlanElement::Group(inner) => self.group(inner, current)?,
                PlanElement::Filter(filter) => {
                    current.retain(|b| eval_filter(filter, b) == Some(true));
                    current
                }
                PlanElement::Bind { expr, slot } => {
                    for binding in &mut current {
                        if let Some(v) = eval_expr(expr, binding)
                            && let Some(cell) = binding.get_mut(*slot)
                        {
                            *cell = Some(v);
                        }
                    }
                    current
                }
            };
        }
        Ok(current)
    }

    /// Join one triple pattern against every input binding. Transitive paths fan out
    /// across rayon workers when the input is large enough; output keeps input order.
    fn triple(&self, triple: &PlanTriple, input: &[Binding]) -> Result<Vec<Binding>> {
        let parallel = triple.is_transitive()
            && self.config.parallel_paths
            && input.len() > 1
            && input.len() >= self.config.parallel_threshold;

        let per_binding: Vec<Vec<Binding>> = if parallel {
            input
                .par_iter()
                .map(|b| self.match_triple(triple, b))
                .collect::<Result<_>>()?
        } else {
            input
                .iter()
                .map(|b| self.match_triple(triple, b))
                .collect::<Result<_>>()?
        };
        Ok(per_binding.into_iter().flatten().collect())
    }

    fn match_triple(&self, triple: &PlanTriple, binding: &Binding) -> Result<Vec<Binding>> {
        let subject = resolve(&triple.subject, binding);
        let object = resolve(&triple.object, binding);

        if let Some(class) = &triple.inferred_class {
            return Ok(self.match_inferred_type(triple, class, subject, binding));
        }

        match &triple.predicate {
            PlanPredicate::Path { path, .. } => {
                self.match_path(triple, path, subject, object, binding)
            }
            PlanPredicate::Var(slot) => match value(binding, *slot) {
                Some(Term::Iri(p)) => {
                    let path = PlanPath::Predicate(p.clone());
                    self.match_path(triple, &path, subject, object, binding)
                }
                Some(Term::Literal(_)) => Ok(Vec::new()),
                None => self.match_any_predicate(triple, *slot, subject, object, binding),
            },
        }
    }

    /// `?x rdf:type C`: every entity that is an instance of `C` or of a subclass.
    fn match_inferred_type(
        &self,
        triple: &PlanTriple,
        class: &str,
        subject: Option<&Term>,
        binding: &Binding,
    ) -> Vec<Binding> {
        match subject {
            Some(Term::Iri(id)) => {
                if self.dataset.is_instance_of(id, class) {
                    vec![binding.clone()]
                } else {
                    Vec::new()
                }
            }
            Some(Term::Literal(_)) => Vec::new(),
            None => self
                .dataset
                .instances_of(class)
                .filter_map(|e| bind(binding, &triple.subject, Term::Iri(e.id.clone())))
                .collect(),
        }
    }

    fn match_path(
        &self,
        triple: &PlanTriple,
        path: &PlanPath,
        subject: Option<&Term>,
        object: Option<&Term>,
        binding: &Binding,
    ) -> Result<Vec<Binding>> {
        match (subject, object) {
            (Some(s), _) => Ok(self
                .path_targets(path, s, Direction::Forward)?
                .into_iter()
                .filter_map(|t| bind(binding, &triple.object, t))
                .collect()),
            (None, Some(o)) => Ok(self
                .path_targets(path, o, Direction::Backward)?
                .into_iter()
                .filter_map(|s| bind(binding, &triple.subject, s))
                .collect()),
            (None, None) => {
                let mut out = Vec::new();
                for start in self.all_nodes() {
                    self.check_deadline()?;
                    let Some(with_subject) = bind(binding, &triple.subject, start.clone()) else {
                        continue;
                    };
                    for target in self.path_targets(path, &start, Direction::Forward)? {
                        if let Some(full) = bind(&with_subject, &triple.object, target) {
                            out.push(full);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    /// `?s ?p ?o` with an unbound predicate: enumerate every edge touching the bound end.
    fn match_any_predicate(
        &self,
        triple: &PlanTriple,
        slot: Slot,
        subject: Option<&Term>,
        object: Option<&Term>,
        binding: &Binding,
    ) -> Result<Vec<Binding>> {
        let edges: Vec<(Term, Term, Term)> = match (subject, object) {
            (Some(s), _) => self
                .edges_from(s)
                .into_iter()
                .map(|(p, o)| (s.clone(), p, o))
                .collect(),
            (None, Some(o)) => self
                .edges_to(o)
                .into_iter()
                .map(|(s, p)| (s, p, o.clone()))
                .collect(),
            (None, None) => {
                let mut all = Vec::new();
                for node in self.all_nodes() {
                    self.check_deadline()?;
                    all.extend(
                        self.edges_from(&node)
                            .into_iter()
                            .map(|(p, o)| (node.clone(), p, o)),
                    );
                }
                all
            }
        };

        Ok(edges
            .into_iter()
            .filter_map(|(s, p, o)| {
                let b = bind(binding, &triple.subject, s)?;
                let b = bind(&b, &PlanTerm::Var(slot), p)?;
                bind(&b, &triple.object, o)
            })
            .collect())
    }

    /// Nodes reachable by `path` from `start`, in traversal order, without duplicates.
    fn path_targets(&self, path: &PlanPath, start: &Term, dir: Direction) -> Result<Vec<Term>> {
        match path {
            PlanPath::Predicate(p) => Ok(self.step(p, start, dir)),
            PlanPath::Inverse(inner) => self.path_targets(inner, start, dir.flip()),
            PlanPath::Alternative(branches) => {
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for branch in branches {
                    for target in self.path_targets(branch, start, dir)? {
                        if seen.insert(target.clone()) {
                            out.push(target);
                        }
                    }
                }
                Ok(out)
            }
            PlanPath::OneOrMore(inner) => self.closure(inner, start, dir),
            PlanPath::ZeroOrMore(inner) => {
                let mut out = vec![start.clone()];
                out.extend(
                    self.closure(inner, start, dir)?
                        .into_iter()
                        .filter(|t| t != start),
                );
                Ok(out)
            }
        }
    }

    /// One or more hops of `inner`: BFS with a visited set. The start node is included
    /// only when a cycle leads back to it.
    fn closure(&self, inner: &PlanPath, start: &Term, dir: Direction) -> Result<Vec<Term>> {
        let mut visited: HashSet<Term> = HashSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::from([start.clone()]);

        while let Some(node) = queue.pop_front() {
            self.check_deadline()?;
            for target in self.path_targets(inner, &node, dir)? {
                if visited.insert(target.clone()) {
                    out.push(target.clone());
                    queue.push_back(target);
                }
            }
        }
        Ok(out)
    }

    /// One hop over predicate `p`.
    fn step(&self, p: &str, node: &Term, dir: Direction) -> Vec<Term> {
        let store = self.dataset.store();
        let hierarchy = self.dataset.hierarchy();

        let id = match node {
            Term::Iri(id) => id.as_str(),
            Term::Literal(v) => {
                return match dir {
                    Direction::Forward => Vec::new(),
                    Direction::Backward => store
                        .subjects_with_attribute(p, Some(v))
                        .map(Term::iri)
                        .collect(),
                };
            }
        };

        if p == vocab::RDF_TYPE {
            return match dir {
                Direction::Forward => store
                    .entity(id)
                    .map(|e| e.classes.iter().map(Term::iri).collect())
                    .unwrap_or_default(),
                Direction::Backward => store
                    .entities_with_class(id)
                    .map(|e| Term::iri(e.id.as_str()))
                    .collect(),
            };
        }

        if p == vocab::RDFS_SUBCLASS_OF {
            return match dir {
                Direction::Forward => hierarchy.direct_parents(id).iter().map(Term::iri).collect(),
                Direction::Backward => hierarchy.direct_children(id).iter().map(Term::iri).collect(),
            };
        }

        match dir {
            Direction::Forward => store
                .relationships_from(id, Some(p))
                .map(|r| Term::iri(r.object.as_str()))
                .chain(store.attribute(id, p).cloned().map(Term::Literal))
                .collect(),
            Direction::Backward => store
                .relationships_to(id, Some(p))
                .map(|r| Term::iri(r.subject.as_str()))
                .collect(),
        }
    }

    /// Every (predicate, object) leaving `node`: relationships, attributes, asserted
    /// classes, then direct parent classes.
    fn edges_from(&self, node: &Term) -> Vec<(Term, Term)> {
        let Term::Iri(id) = node else {
            return Vec::new();
        };
        let store = self.dataset.store();
        let mut edges: Vec<(Term, Term)> = store
            .relationships_from(id, None)
            .map(|r| (Term::iri(r.predicate.as_str()), Term::iri(r.object.as_str())))
            .collect();
        if let Some(entity) = store.entity(id) {
            edges.extend(
                entity
                    .attributes
                    .iter()
                    .map(|(name, v)| (Term::iri(name.as_str()), Term::Literal(v.clone()))),
            );
            edges.extend(
                entity
                    .classes
                    .iter()
                    .map(|c| (Term::iri(vocab::RDF_TYPE), Term::iri(c.as_str()))),
            );
        }
        edges.extend(
            self.dataset
                .hierarchy()
                .direct_parents(id)
                .iter()
                .map(|parent| (Term::iri(vocab::RDFS_SUBCLASS_OF), Term::iri(parent.as_str()))),
        );
        edges
    }

    /// Every (subject, predicate) arriving at `node`.
    fn edges_to(&self, node: &Term) -> Vec<(Term, Term)> {
        let store = self.dataset.store();
        match node {
            Term::Literal(v) => store
                .entities()
                .flat_map(|e| {
                    e.attributes
                        .iter()
                        .filter(move |(_, value)| *value == v)
                        .map(move |(name, _)| (Term::iri(e.id.as_str()), Term::iri(name.as_str())))
                })
                .collect(),
            Term::Iri(id) => {
                let mut edges: Vec<(Term, Term)> = store
                    .relationships_to(id, None)
                    .map(|r| (Term::iri(r.subject.as_str()), Term::iri(r.predicate.as_str())))
                    .collect();
                edges.extend(
                    self.step(vocab::RDF_TYPE, node, Direction::Backward)
                        .into_iter()
                        .map(|s| (s, Term::iri(vocab::RDF_TYPE))),
                );
                edges.extend(
                    self.step(vocab::RDFS_SUBCLASS_OF, node, Direction::Backward)
                        .into_iter()
                        .map(|s| (s, Term::iri(vocab::RDFS_SUBCLASS_OF))),
                );
                edges
            }
        }
    }

    /// Candidate start nodes for a pattern with both ends unbound: entities in
    /// identifier order, then classes that are not also entities.
    fn all_nodes(&self) -> Vec<Term> {
        let store = self.dataset.store();
        store
            .entities()
            .map(|e| Term::iri(e.id.as_str()))
            .chain(
                self.dataset
                    .hierarchy()
                    .classes()
                    .filter(|c| !store.contains(c))
                    .map(Term::iri),
            )
            .collect()
    }
}

fn value(binding: &Binding, slot: Slot) -> Option<&Term> {
    binding.get(slot).and_then(Option::as_ref)
}

fn resolve<'b>(term: &'b PlanTerm, binding: &'b Binding) -> Option<&'b Term> {
    match term {
        PlanTerm::Var(slot) => value(binding, *slot),
        PlanTerm::Const(t) => Some(t),
    }
}

/// Extend `binding` so that `pattern` matches `term`. `None` on conflict.
fn bind(binding: &Binding, pattern: &PlanTerm, term: Term) -> Option<Binding> {
    match pattern {
        PlanTerm::Const(c) => (*c == term).then(|| binding.clone()),
        PlanTerm::Var(slot) => match value(binding, *slot) {
            Some(existing) => (*existing == term).then(|| binding.clone()),
            None => {
                let mut extended = binding.clone();
                *extended.get_mut(*slot)? = Some(term);
                Some(extended)
            }
        },
    }
}

/// `None` is an evaluation error (for example, an unbound variable).
fn eval_expr(expr: &PlanExpr, binding: &Binding) -> Option<Term> {
    match expr {
        PlanExpr::Var(slot) => value(binding, *slot).cloned(),
        PlanExpr::Const(t) => Some(t.clone()),
        PlanExpr::LocalName(inner) => match eval_expr(inner, binding)? {
            Term::Iri(iri) => Some(Term::literal(vocab::local_name(&iri))),
            Term::Literal(Value::String(s)) => Some(Term::literal(vocab::local_name(&s))),
            Term::Literal(_) => None,
        },
    }
}

/// Three-valued: `None` means the filter errored, which excludes the solution.
fn eval_filter(filter: &PlanFilter, binding: &Binding) -> Option<bool> {
    match filter {
        PlanFilter::In { expr, set, negated } => {
            let needle = eval_expr(expr, binding)?;
            let found = set
                .iter()
                .filter_map(|e| eval_expr(e, binding))
                .any(|t| t == needle);
            Some(found != *negated)
        }
        PlanFilter::Bound(slot) => Some(value(binding, *slot).is_some()),
        PlanFilter::Not(inner) => eval_filter(inner, binding).map(|b| !b),
    }
}

fn count_solutions(solutions: &[Binding], var: Option<Slot>, distinct: bool) -> usize {
    match (var, distinct) {
        (None, false) => solutions.len(),
        (None, true) => solutions.iter().collect::<HashSet<_>>().len(),
        (Some(slot), false) => solutions.iter().filter(|b| value(b, slot).is_some()).count(),
        (Some(slot), true) => solutions
            .iter()
            .filter_map(|b| value(b, slot))
            .collect::<HashSet<_>>()
            .len(),
    }
}

/// Ascending, unbound first.
fn compare_rows(a: &Binding, b: &Binding, order_by: &[Slot]) -> Ordering {
    for &slot in order_by {
        let ord = match (value(a, slot), value(b, slot)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.order_cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
