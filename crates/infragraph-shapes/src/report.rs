//! Validation results and the aggregate report.

use crate::shape::{ConstraintKind, Severity};
use infragraph_core::model::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value that failed a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultValue {
    /// An attribute value.
    Literal(Value),
    /// The object entity of an edge.
    Node(String),
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Value::String(s)) => write!(f, "\"{}\"", s),
            Self::Literal(v) => write!(f, "{}", v),
            Self::Node(id) => write!(f, "<{}>", id),
        }
    }
}

/// One failed constraint on one focus entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub focus: String,
    pub shape_id: String,
    pub constraint_id: String,
    pub kind: ConstraintKind,
    /// The attribute or predicate that was checked.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ResultValue>,
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}/{} ({} on {}): {}",
            self.severity,
            self.focus,
            self.shape_id,
            self.constraint_id,
            self.kind,
            self.path,
            self.message
        )
    }
}

/// Result counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub violations: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl ReportSummary {
    pub fn total(&self) -> usize {
        self.violations + self.warnings + self.infos
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff no result has Violation severity.
    pub conforms: bool,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub(crate) fn from_results(results: Vec<ValidationResult>) -> Self {
        let conforms = results.iter().all(|r| r.severity != Severity::Violation);
        Self { conforms, results }
    }

    pub fn violations(&self) -> impl Iterator<Item = &ValidationResult> {
        self.with_severity(Severity::Violation)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.with_severity(Severity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &ValidationResult> {
        self.with_severity(Severity::Info)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(move |r| r.severity == severity)
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for result in &self.results {
            match result.severity {
                Severity::Violation => summary.violations += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary
    }

    /// Results whose focus is `entity`, in report order.
    pub fn for_focus<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a ValidationResult> {
        self.results.iter().filter(move |r| r.focus == entity)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        writeln!(
            f,
            "Conforms: {} ({} violation(s), {} warning(s), {} info(s))",
            self.conforms, summary.violations, summary.warnings, summary.infos
        )?;
        for result in &self.results {
            writeln!(f, "  {}", result)?;
        }
        Ok(())
    }
}
