//! Declarative shapes: per-target-class constraint sets.

use crate::error::{Result, ShapeError};
use anyhow::Context;
use infragraph_core::model::{Datatype, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// How serious a failed constraint is. Only [`Severity::Violation`] affects conformance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Violation,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Violation => write!(f, "VIOLATION"),
            Self::Warning => write!(f, "WARNING"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

/// The check a constraint performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    RequiredAttribute {
        attribute: String,
    },
    Datatype {
        attribute: String,
        datatype: Datatype,
    },
    In {
        attribute: String,
        values: Vec<Value>,
    },
    /// Inclusive numeric bounds.
    Range {
        attribute: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Number of `predicate` edges from the focus, optionally counting only objects
    /// that are instances of `qualified_class`.
    Cardinality {
        predicate: String,
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
        #[serde(default)]
        qualified_class: Option<String>,
    },
    /// Every `predicate` object must be an instance of at least one of `classes`.
    TargetClass {
        predicate: String,
        classes: Vec<String>,
    },
}

/// Discriminant of a [`Rule`], carried on each validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    RequiredAttribute,
    Datatype,
    In,
    Range,
    Cardinality,
    TargetClass,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RequiredAttribute => "required_attribute",
            Self::Datatype => "datatype",
            Self::In => "in",
            Self::Range => "range",
            Self::Cardinality => "cardinality",
            Self::TargetClass => "target_class",
        };
        write!(f, "{}", name)
    }
}

impl Rule {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::RequiredAttribute { .. } => ConstraintKind::RequiredAttribute,
            Self::Datatype { .. } => ConstraintKind::Datatype,
            Self::In { .. } => ConstraintKind::In,
            Self::Range { .. } => ConstraintKind::Range,
            Self::Cardinality { .. } => ConstraintKind::Cardinality,
            Self::TargetClass { .. } => ConstraintKind::TargetClass,
        }
    }

    /// The attribute or predicate the rule inspects.
    pub fn path(&self) -> &str {
        match self {
            Self::RequiredAttribute { attribute }
            | Self::Datatype { attribute, .. }
            | Self::In { attribute, .. }
            | Self::Range { attribute, .. } => attribute,
            Self::Cardinality { predicate, .. } | Self::TargetClass { predicate, .. } => predicate,
        }
    }

    /// Reason the rule can never be satisfied, if any.
    fn defect(&self) -> Option<String> {
        match self {
            Self::In { values, .. } if values.is_empty() => {
                Some("enumeration has no allowed values".to_string())
            }
            Self::Range {
                min: Some(min),
                max: Some(max),
                ..
            } if min > max => Some(format!("min {} exceeds max {}", min, max)),
            Self::Range { min, max, .. }
                if min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan) =>
            {
                Some("range bound is NaN".to_string())
            }
            Self::Cardinality {
                min: Some(min),
                max: Some(max),
                ..
            } if min > max => Some(format!("min {} exceeds max {}", min, max)),
            Self::TargetClass { classes, .. } if classes.is_empty() => {
                Some("no target classes listed".to_string())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    pub rule: Rule,
    /// Overrides the generated result message.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Severity,
}

impl Constraint {
    pub fn new(id: impl Into<String>, rule: Rule) -> Self {
        Self {
            id: id.into(),
            rule,
            message: None,
            severity: Severity::Violation,
        }
    }

    pub fn required(id: impl Into<String>, attribute: &str) -> Self {
        Self::new(
            id,
            Rule::RequiredAttribute {
                attribute: attribute.to_string(),
            },
        )
    }

    pub fn datatype(id: impl Into<String>, attribute: &str, datatype: Datatype) -> Self {
        Self::new(
            id,
            Rule::Datatype {
                attribute: attribute.to_string(),
                datatype,
            },
        )
    }

    pub fn one_of(
        id: impl Into<String>,
        attribute: &str,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self::new(
            id,
            Rule::In {
                attribute: attribute.to_string(),
                values: values.into_iter().collect(),
            },
        )
    }

    pub fn range(
        id: impl Into<String>,
        attribute: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        Self::new(
            id,
            Rule::Range {
                attribute: attribute.to_string(),
                min,
                max,
            },
        )
    }

    pub fn cardinality(
        id: impl Into<String>,
        predicate: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Self {
        Self::new(
            id,
            Rule::Cardinality {
                predicate: predicate.to_string(),
                min,
                max,
                qualified_class: None,
            },
        )
    }

    pub fn target_class<'a>(
        id: impl Into<String>,
        predicate: &str,
        classes: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::new(
            id,
            Rule::TargetClass {
                predicate: predicate.to_string(),
                classes: classes.into_iter().map(String::from).collect(),
            },
        )
    }

    /// Restrict a cardinality count to objects of `class`. No effect on other rules.
    #[must_use]
    pub fn qualified(mut self, class: &str) -> Self {
        if let Rule::Cardinality {
            qualified_class, ..
        } = &mut self.rule
        {
            *qualified_class = Some(class.to_string());
        }
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: String,
    pub target_class: String,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Shape {
    pub fn new(id: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target_class: target_class.into(),
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// An ordered collection of shapes. Order is the validation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeSet {
    pub shapes: Vec<Shape>,
}

impl ShapeSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Parse a JSON array of shapes.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse shape set JSON")
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Reject duplicate identifiers and unsatisfiable constraints.
    ///
    /// Shape ids are unique across the set; constraint ids are unique within a shape.
    pub fn check(&self) -> Result<()> {
        let mut shape_ids = HashSet::new();
        for shape in &self.shapes {
            if !shape_ids.insert(shape.id.as_str()) {
                return Err(ShapeError::DuplicateId {
                    id: shape.id.clone(),
                });
            }
            let mut constraint_ids = HashSet::new();
            for constraint in &shape.constraints {
                if !constraint_ids.insert(constraint.id.as_str()) {
                    return Err(ShapeError::DuplicateId {
                        id: format!("{}/{}", shape.id, constraint.id),
                    });
                }
                if let Some(message) = constraint.rule.defect() {
                    return Err(ShapeError::InvalidConstraint {
                        shape_id: shape.id.clone(),
                        constraint_id: constraint.id.clone(),
                        message,
                    });
                }
            }
        }
        Ok(())
    }
}
