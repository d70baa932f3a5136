//! Query entry point: prepare and run structured queries against a [`Dataset`].

use crate::error::Result;
use crate::eval::Evaluator;
use crate::prefix::PrefixMap;
use crate::prepare::{self, PreparedQuery};
use crate::query::Query;
use crate::results::QueryResults;
use infragraph_core::Dataset;
use infragraph_core::config::QueryConfig;
use std::time::{Duration, Instant};

/// Per-execution context: prefix bindings and an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub prefixes: PrefixMap,
    pub deadline: Option<Instant>,
}

impl QueryContext {
    pub fn new(prefixes: PrefixMap) -> Self {
        Self {
            prefixes,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// Read-only query session over a loaded dataset. Cheap to create; any number may
/// share one dataset.
#[derive(Debug, Clone)]
pub struct QueryEngine<'a> {
    dataset: &'a Dataset,
    config: QueryConfig,
}

impl<'a> QueryEngine<'a> {
    pub fn new(dataset: &'a Dataset, config: &QueryConfig) -> Self {
        Self {
            dataset,
            config: config.clone(),
        }
    }

    /// Validate a query and expand its prefixes. Fails with a syntax error before any
    /// evaluation happens.
    pub fn prepare(&self, query: &Query, context: &QueryContext) -> Result<PreparedQuery> {
        Ok(prepare::prepare(query, &context.prefixes)?)
    }

    pub fn run(&self, prepared: &PreparedQuery, context: &QueryContext) -> Result<QueryResults> {
        let started = Instant::now();
        let evaluator = Evaluator {
            dataset: self.dataset,
            config: &self.config,
            deadline: context.deadline,
        };
        let results = evaluator.run(prepared)?;
        tracing::debug!(
            rows = results.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "query executed"
        );
        Ok(results)
    }

    pub fn execute(&self, query: &Query, context: &QueryContext) -> Result<QueryResults> {
        let prepared = self.prepare(query, context)?;
        self.run(&prepared, context)
    }
}
