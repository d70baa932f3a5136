//! Bulk loader: stages load records in batches and freezes them into a [`Dataset`].
//!
//! Entities and class declarations are applied as they arrive. Attributes and
//! relationships are deferred and integrity-checked when the load finishes, so the
//! order of records in the input does not matter.

use crate::config::{LoadConfig, LoadPolicy};
use crate::dataset::Dataset;
use crate::error::{GraphError, Result};
use crate::hierarchy::TypeHierarchy;
use crate::model::{AttributeAssertion, ClassDecl, EntityDecl, Relationship, Value};
use crate::store::{AttributeInsert, GraphStore};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One unit of raw graph data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadRecord {
    Class(ClassDecl),
    Entity(EntityDecl),
    Attribute(AttributeAssertion),
    Relationship(Relationship),
}

impl LoadRecord {
    pub fn class(name: impl Into<String>, parents: &[&str]) -> Self {
        Self::Class(ClassDecl {
            name: name.into(),
            parents: parents.iter().map(|p| (*p).to_string()).collect(),
        })
    }

    pub fn entity(id: impl Into<String>, classes: &[&str]) -> Self {
        Self::Entity(EntityDecl {
            id: id.into(),
            classes: classes.iter().map(|c| (*c).to_string()).collect(),
        })
    }

    pub fn attribute(
        subject: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::Attribute(AttributeAssertion {
            subject: subject.into(),
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn relationship(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self::Relationship(Relationship::new(subject, predicate, object))
    }
}

/// Load records grouped by kind, for collaborators that exchange JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBatch {
    pub classes: Vec<ClassDecl>,
    pub entities: Vec<EntityDecl>,
    pub attributes: Vec<AttributeAssertion>,
    pub relationships: Vec<Relationship>,
}

impl LoadBatch {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse load batch JSON")
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.entities.len() + self.attributes.len() + self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into records: classes, entities, attributes, then relationships.
    pub fn into_records(self) -> impl Iterator<Item = LoadRecord> {
        self.classes
            .into_iter()
            .map(LoadRecord::Class)
            .chain(self.entities.into_iter().map(LoadRecord::Entity))
            .chain(self.attributes.into_iter().map(LoadRecord::Attribute))
            .chain(self.relationships.into_iter().map(LoadRecord::Relationship))
    }
}

/// Shared cancellation flag, checked by the loader between batches.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A record excluded from the dataset under [`LoadPolicy::Collect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadIssue {
    DanglingRelationship {
        subject: String,
        predicate: String,
        missing: String,
    },
    DanglingAttribute {
        subject: String,
        name: String,
    },
    DuplicateAttribute {
        subject: String,
        name: String,
        kept: Value,
        rejected: Value,
    },
}

impl LoadIssue {
    /// The error this issue raises under [`LoadPolicy::FailFast`].
    pub fn to_error(&self) -> GraphError {
        match self {
            Self::DanglingRelationship {
                subject,
                predicate,
                missing,
            } => GraphError::ReferentialIntegrity {
                subject: subject.clone(),
                predicate: predicate.clone(),
                missing: missing.clone(),
            },
            Self::DanglingAttribute { subject, name } => GraphError::ReferentialIntegrity {
                subject: subject.clone(),
                predicate: name.clone(),
                missing: subject.clone(),
            },
            Self::DuplicateAttribute { subject, name, .. } => GraphError::DuplicateAttribute {
                subject: subject.clone(),
                name: name.clone(),
            },
        }
    }
}

/// Summary of what a load accepted and what it excluded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub records: usize,
    pub classes: usize,
    pub entities: usize,
    pub attributes: usize,
    pub relationships: usize,
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Output of a successful load.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub dataset: Dataset,
    pub report: LoadReport,
}

/// Bulk loader configured with an integrity policy and batch size.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoadConfig,
    cancel: Option<CancellationToken>,
}

/// Records accumulated before integrity checks run.
struct Staging {
    store: GraphStore,
    classes: Vec<(String, Vec<String>)>,
    deferred: Vec<LoadRecord>,
}

impl Staging {
    fn new() -> Self {
        Self {
            store: GraphStore::new(),
            classes: Vec::new(),
            deferred: Vec::new(),
        }
    }

    fn apply(&mut self, record: LoadRecord) {
        match record {
            LoadRecord::Class(decl) => self.classes.push((decl.name, decl.parents)),
            LoadRecord::Entity(decl) => {
                for class in &decl.classes {
                    self.classes.push((class.clone(), Vec::new()));
                }
                self.store.insert_entity(&decl.id, &decl.classes);
            }
            deferred @ (LoadRecord::Attribute(_) | LoadRecord::Relationship(_)) => {
                self.deferred.push(deferred);
            }
        }
    }
}

impl Loader {
    pub fn new(config: LoadConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Insert deferred attributes and edges, checking integrity under the configured
    /// policy. Cancellation is checked every `batch_size` records; `applied` then counts
    /// the immediately applied records plus the deferred ones integrated so far.
    fn integrate(
        &self,
        store: &mut GraphStore,
        deferred: Vec<LoadRecord>,
        report: &mut LoadReport,
    ) -> Result<()> {
        let batch_size = self.config.batch_size.max(1);
        let base = report.records.saturating_sub(deferred.len());
        let mut seen_edges: HashSet<Relationship> = HashSet::new();

        for (i, record) in deferred.into_iter().enumerate() {
            if i % batch_size == 0 && self.is_cancelled() {
                let applied = base + i;
                tracing::info!(applied, "load cancelled during integration");
                return Err(GraphError::LoadCancelled { applied });
            }
            let issue = match record {
                LoadRecord::Attribute(attr) => {
                    match store.insert_attribute(&attr.subject, &attr.name, attr.value.clone()) {
                        AttributeInsert::Inserted => {
                            report.attributes += 1;
                            None
                        }
                        // Re-asserting the same value is the same fact.
                        AttributeInsert::Duplicate(kept) if kept == attr.value => None,
                        AttributeInsert::Duplicate(kept) => Some(LoadIssue::DuplicateAttribute {
                            subject: attr.subject,
                            name: attr.name,
                            kept,
                            rejected: attr.value,
                        }),
                        AttributeInsert::MissingSubject => Some(LoadIssue::DanglingAttribute {
                            subject: attr.subject,
                            name: attr.name,
                        }),
                    }
                }
                LoadRecord::Relationship(rel) => {
                    let missing = [&rel.subject, &rel.object]
                        .into_iter()
                        .find(|id| !store.contains(id))
                        .cloned();
                    if let Some(missing) = missing {
                        Some(LoadIssue::DanglingRelationship {
                            subject: rel.subject,
                            predicate: rel.predicate,
                            missing,
                        })
                    } else {
                        if seen_edges.insert(rel.clone()) {
                            store.push_relationship(rel);
                            report.relationships += 1;
                        }
                        None
                    }
                }
                LoadRecord::Class(_) | LoadRecord::Entity(_) => None,
            };

            if let Some(issue) = issue {
                match self.config.policy {
                    LoadPolicy::FailFast => return Err(issue.to_error()),
                    LoadPolicy::Collect => {
                        tracing::warn!(?issue, "excluding record that fails integrity check");
                        report.issues.push(issue);
                    }
                }
            }
        }

        Ok(())
    }

    /// Load records into a frozen [`Dataset`].
    ///
    /// Cancellation is checked before each batch of `batch_size` records, once more
    /// before integrity checks, and every `batch_size` deferred records while they are
    /// integrated. A cyclic class hierarchy always fails the load.
    pub fn load<I>(&self, records: I) -> Result<Loaded>
    where
        I: IntoIterator<Item = LoadRecord>,
    {
        let batch_size = self.config.batch_size.max(1);
        let mut staging = Staging::new();
        let mut applied = 0usize;

        for record in records {
            if applied % batch_size == 0 && self.is_cancelled() {
                tracing::info!(applied, "load cancelled");
                return Err(GraphError::LoadCancelled { applied });
            }
            staging.apply(record);
            applied += 1;
        }
        if self.is_cancelled() {
            tracing::info!(applied, "load cancelled");
            return Err(GraphError::LoadCancelled { applied });
        }

        let hierarchy = TypeHierarchy::build(staging.classes)?;
        let mut store = staging.store;
        let mut report = LoadReport {
            records: applied,
            ..LoadReport::default()
        };
        self.integrate(&mut store, staging.deferred, &mut report)?;

        store.rebuild_indexes();
        report.classes = hierarchy.len();
        report.entities = store.entity_count();

        tracing::info!(
            records = report.records,
            classes = report.classes,
            entities = report.entities,
            attributes = report.attributes,
            relationships = report.relationships,
            issues = report.issues.len(),
            "load complete"
        );

        Ok(Loaded {
            dataset: Dataset::new(store, hierarchy),
            report,
        })
    }
}
