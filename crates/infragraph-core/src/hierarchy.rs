//! Class hierarchy index: reflexive-transitive subclass closure.
//!
//! Built once from declared subclass edges. Every class's ancestor set is computed by a
//! memoized DFS that also detects cycles, so a constructed index is always a DAG.

use crate::error::{GraphError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Ancestor/descendant closure over the declared classes.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    /// Direct parents per class, deduplicated, in declaration order.
    parents: BTreeMap<String, Vec<String>>,
    /// Reflexive ancestor closure per class.
    ancestors: HashMap<String, BTreeSet<String>>,
    /// Reflexive descendant closure per class.
    descendants: HashMap<String, BTreeSet<String>>,
    /// Direct subclasses per class, in sorted order.
    children: HashMap<String, Vec<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// DFS state for closure computation, bundled to keep recursion signatures short.
struct ClosureContext<'a> {
    parents: &'a BTreeMap<String, Vec<String>>,
    marks: HashMap<&'a str, Mark>,
    stack: Vec<&'a str>,
    ancestors: HashMap<String, BTreeSet<String>>,
}

impl<'a> ClosureContext<'a> {
    fn visit(&mut self, class: &'a str) -> Result<()> {
        match self.marks.get(class) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = self.stack.iter().position(|c| *c == class).unwrap_or(0);
                let mut path: Vec<String> =
                    self.stack[start..].iter().map(|c| (*c).to_string()).collect();
                path.push(class.to_string());
                return Err(GraphError::Cycle { path });
            }
            None => {}
        }

        self.marks.insert(class, Mark::Visiting);
        self.stack.push(class);

        let declared = self.parents;
        let mut closure = BTreeSet::from([class.to_string()]);
        if let Some(parents) = declared.get(class) {
            for parent in parents {
                self.visit(parent)?;
                if let Some(inherited) = self.ancestors.get(parent.as_str()) {
                    closure.extend(inherited.iter().cloned());
                }
            }
        }

        self.stack.pop();
        self.marks.insert(class, Mark::Done);
        self.ancestors.insert(class.to_string(), closure);
        Ok(())
    }
}

impl TypeHierarchy {
    /// Build the index from `(class, parents)` declarations.
    ///
    /// Parents that are never declared themselves become root classes. Repeated
    /// declarations of a class merge their parent lists.
    pub fn build<I, S>(declarations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let mut parents: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (class, declared) in declarations {
            let class = class.into();
            let declared: Vec<String> = declared.into_iter().map(Into::into).collect();
            for parent in &declared {
                parents.entry(parent.clone()).or_default();
            }
            let entry = parents.entry(class).or_default();
            for parent in declared {
                if !entry.contains(&parent) {
                    entry.push(parent);
                }
            }
        }

        let mut ctx = ClosureContext {
            parents: &parents,
            marks: HashMap::new(),
            stack: Vec::new(),
            ancestors: HashMap::new(),
        };
        for class in parents.keys() {
            ctx.visit(class)?;
        }
        let ancestors = ctx.ancestors;

        let mut descendants: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (class, closure) in &ancestors {
            for ancestor in closure {
                descendants
                    .entry(ancestor.clone())
                    .or_default()
                    .insert(class.clone());
            }
        }

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for (class, declared) in &parents {
            for parent in declared {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(class.clone());
            }
        }

        tracing::debug!(classes = parents.len(), "class hierarchy indexed");

        Ok(Self {
            parents,
            ancestors,
            descendants,
            children,
        })
    }

    /// Whether the class is known (declared or referenced as a parent).
    pub fn contains(&self, class: &str) -> bool {
        self.parents.contains_key(class)
    }

    /// All known classes in sorted order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.parents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Declared parents of a class, in declaration order.
    pub fn direct_parents(&self, class: &str) -> &[String] {
        self.parents.get(class).map_or(&[], Vec::as_slice)
    }

    /// Classes that declare `class` as a direct parent, in sorted order.
    pub fn direct_children(&self, class: &str) -> &[String] {
        self.children.get(class).map_or(&[], Vec::as_slice)
    }

    /// Reflexive ancestor closure, sorted. Empty for unknown classes.
    pub fn ancestors<'a>(&'a self, class: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.ancestors
            .get(class)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Reflexive descendant closure, sorted. Empty for unknown classes.
    pub fn descendants<'a>(&'a self, class: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.descendants
            .get(class)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Reflexive subclass test: `class` equals `ancestor` or inherits from it.
    pub fn is_subclass_of(&self, class: &str, ancestor: &str) -> bool {
        class == ancestor
            || self
                .ancestors
                .get(class)
                .is_some_and(|closure| closure.contains(ancestor))
    }

    /// Whether an entity asserting `classes` is an instance of `class`.
    pub fn is_instance_of<S: AsRef<str>>(&self, classes: &[S], class: &str) -> bool {
        classes
            .iter()
            .any(|asserted| self.is_subclass_of(asserted.as_ref(), class))
    }
}
