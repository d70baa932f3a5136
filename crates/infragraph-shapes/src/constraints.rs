//! Per-rule checks against a single focus entity.
//!
//! Each check returns its findings in edge insertion order; the engine attaches the
//! shape, constraint and severity.

use crate::report::ResultValue;
use crate::shape::Rule;
use infragraph_core::Dataset;
use infragraph_core::model::{Datatype, Value};

/// A failed check before it is attributed to a shape and constraint.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Finding {
    pub value: Option<ResultValue>,
    pub message: String,
}

impl Finding {
    fn new(value: Option<ResultValue>, message: String) -> Self {
        Self { value, message }
    }
}

pub(crate) fn check(dataset: &Dataset, focus: &str, rule: &Rule) -> Vec<Finding> {
    match rule {
        Rule::RequiredAttribute { attribute } => required(dataset, focus, attribute),
        Rule::Datatype {
            attribute,
            datatype,
        } => attribute_value(dataset, focus, attribute)
            .and_then(|v| datatype_mismatch(v, *datatype))
            .into_iter()
            .collect(),
        Rule::In { attribute, values } => attribute_value(dataset, focus, attribute)
            .and_then(|v| not_in(v, values))
            .into_iter()
            .collect(),
        Rule::Range {
            attribute,
            min,
            max,
        } => attribute_value(dataset, focus, attribute)
            .and_then(|v| out_of_range(v, *min, *max))
            .into_iter()
            .collect(),
        Rule::Cardinality {
            predicate,
            min,
            max,
            qualified_class,
        } => cardinality(
            dataset,
            focus,
            predicate,
            *min,
            *max,
            qualified_class.as_deref(),
        )
        .into_iter()
        .collect(),
        Rule::TargetClass { predicate, classes } => {
            target_class(dataset, focus, predicate, classes)
        }
    }
}

fn attribute_value<'a>(dataset: &'a Dataset, focus: &str, attribute: &str) -> Option<&'a Value> {
    dataset.store().attribute(focus, attribute)
}

fn required(dataset: &Dataset, focus: &str, attribute: &str) -> Vec<Finding> {
    if attribute_value(dataset, focus, attribute).is_some() {
        return Vec::new();
    }
    vec![Finding::new(
        None,
        format!("Missing required attribute {}", attribute),
    )]
}

fn datatype_mismatch(value: &Value, expected: Datatype) -> Option<Finding> {
    let actual = value.datatype();
    (actual != expected).then(|| {
        Finding::new(
            Some(ResultValue::Literal(value.clone())),
            format!(
                "Expected datatype {} but found {} ({})",
                expected, actual, value
            ),
        )
    })
}

fn not_in(value: &Value, allowed: &[Value]) -> Option<Finding> {
    if allowed.contains(value) {
        return None;
    }
    let allowed = allowed
        .iter()
        .map(Value::lexical_form)
        .collect::<Vec<_>>()
        .join(", ");
    Some(Finding::new(
        Some(ResultValue::Literal(value.clone())),
        format!("Value {} is not in the allowed set [{}]", value, allowed),
    ))
}

fn out_of_range(value: &Value, min: Option<f64>, max: Option<f64>) -> Option<Finding> {
    let literal = Some(ResultValue::Literal(value.clone()));
    let Some(n) = value.as_f64() else {
        return Some(Finding::new(
            literal,
            format!("Value {} is not numeric", value),
        ));
    };
    if let Some(min) = min
        && n < min
    {
        return Some(Finding::new(
            literal,
            format!("Value {} is less than minimum {}", value, min),
        ));
    }
    if let Some(max) = max
        && n > max
    {
        return Some(Finding::new(
            literal,
            format!("Value {} is greater than maximum {}", value, max),
        ));
    }
    None
}

fn cardinality(
    dataset: &Dataset,
    focus: &str,
    predicate: &str,
    min: Option<usize>,
    max: Option<usize>,
    qualified_class: Option<&str>,
) -> Option<Finding> {
    let count = dataset
        .store()
        .relationships_from(focus, Some(predicate))
        .filter(|r| qualified_class.is_none_or(|c| dataset.is_instance_of(&r.object, c)))
        .count();
    let qualifier = qualified_class
        .map(|c| format!(" of class {}", c))
        .unwrap_or_default();

    if let Some(min) = min
        && count < min
    {
        return Some(Finding::new(
            None,
            format!(
                "Expected at least {} value(s){} but found {}",
                min, qualifier, count
            ),
        ));
    }
    if let Some(max) = max
        && count > max
    {
        return Some(Finding::new(
            None,
            format!(
                "Expected at most {} value(s){} but found {}",
                max, qualifier, count
            ),
        ));
    }
    None
}

fn target_class(
    dataset: &Dataset,
    focus: &str,
    predicate: &str,
    classes: &[String],
) -> Vec<Finding> {
    dataset
        .store()
        .relationships_from(focus, Some(predicate))
        .filter(|r| !classes.iter().any(|c| dataset.is_instance_of(&r.object, c)))
        .map(|r| {
            Finding::new(
                Some(ResultValue::Node(r.object.clone())),
                format!(
                    "Value {} of {} is not an instance of any of [{}]",
                    r.object,
                    predicate,
                    classes.join(", ")
                ),
            )
        })
        .collect()
}
