//! Validation entry point: run a [`ShapeSet`] over a [`Dataset`].

use crate::constraints;
use crate::error::Result;
use crate::report::{ValidationReport, ValidationResult};
use crate::shape::{Severity, ShapeSet};
use infragraph_core::Dataset;
use infragraph_core::config::ValidationConfig;
use std::time::Instant;

/// Read-only validation session over a loaded dataset.
#[derive(Debug, Clone)]
pub struct ValidationEngine<'a> {
    dataset: &'a Dataset,
    config: ValidationConfig,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(dataset: &'a Dataset, config: &ValidationConfig) -> Self {
        Self {
            dataset,
            config: config.clone(),
        }
    }

    /// Check `shapes`, then validate every focus entity against them.
    ///
    /// Shapes run in set order, focus entities in identifier order, constraints in
    /// declaration order. With `abort_on_first`, stops after the first
    /// Violation-severity result.
    pub fn validate(&self, shapes: &ShapeSet) -> Result<ValidationReport> {
        shapes.check()?;
        let started = Instant::now();
        let mut results = Vec::new();

        'shapes: for shape in &shapes.shapes {
            let mut focus_count = 0usize;
            for entity in self.dataset.instances_of(&shape.target_class) {
                focus_count += 1;
                for constraint in &shape.constraints {
                    for finding in constraints::check(self.dataset, &entity.id, &constraint.rule) {
                        results.push(ValidationResult {
                            focus: entity.id.clone(),
                            shape_id: shape.id.clone(),
                            constraint_id: constraint.id.clone(),
                            kind: constraint.rule.kind(),
                            path: constraint.rule.path().to_string(),
                            value: finding.value,
                            message: constraint.message.clone().unwrap_or(finding.message),
                            severity: constraint.severity,
                        });
                        if self.config.abort_on_first && constraint.severity == Severity::Violation
                        {
                            tracing::debug!(
                                shape = %shape.id,
                                focus = %entity.id,
                                "stopping at first violation"
                            );
                            break 'shapes;
                        }
                    }
                }
            }
            tracing::debug!(shape = %shape.id, focus_count, "shape validated");
        }

        let report = ValidationReport::from_results(results);
        let summary = report.summary();
        tracing::info!(
            conforms = report.conforms,
            violations = summary.violations,
            warnings = summary.warnings,
            infos = summary.infos,
            elapsed_ms = started.elapsed().as_millis(),
            "validation complete"
        );
        Ok(report)
    }
}
