//! Namespace prefix bindings supplied with each query execution.

use crate::error::QuerySyntaxError;
use crate::query::IriRef;
use infragraph_core::vocab;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix → namespace IRI. The empty prefix is the default (`:local`) namespace.
///
/// Nothing is bound implicitly, not even `rdf:`. Use
/// [`with_standard_prefixes`](Self::with_standard_prefixes) to opt in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMap {
    prefixes: BTreeMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.insert(prefix, namespace);
        self
    }

    /// Bind `rdf:`, `rdfs:` and `xsd:`.
    #[must_use]
    pub fn with_standard_prefixes(self) -> Self {
        self.with("rdf", vocab::RDF)
            .with("rdfs", vocab::RDFS)
            .with("xsd", vocab::XSD)
    }

    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Expand an IRI reference to a full IRI.
    pub fn expand(&self, iri: &IriRef) -> Result<String, QuerySyntaxError> {
        match iri {
            IriRef::Full(full) => Ok(full.clone()),
            IriRef::Prefixed { prefix, local } => match self.prefixes.get(prefix) {
                Some(ns) => Ok(format!("{}{}", ns, local)),
                None => Err(QuerySyntaxError::UndeclaredPrefix {
                    prefix: prefix.clone(),
                    iri: iri.to_string(),
                }),
            },
        }
    }
}
