//! Condition evaluation — ANDed predicates over the trigger payload.
//!
//! Evaluation short-circuits on the first `false`.  Operator semantics:
//!
//! - `equals` / `not_equals`: strict JSON value equality.
//! - `contains`: string containment after rendering both sides as text
//!   (strings bare, other values as compact JSON); a missing field never
//!   contains anything.
//! - `greater_than` / `less_than`: defined for JSON numbers only — any
//!   non-numeric operand (including numeric-looking strings) makes the
//!   condition `false`; values are never coerced.
//! - `exists`: true iff the field is present and not null.
//!
//! An `Unknown` operator is an error, not `false`: the run must fail so a
//! misconfigured condition cannot be mistaken for an unmet one.

use std::cmp::Ordering;

use serde_json::Value;
use thiserror::Error;

use crate::models::{Condition, Operator};
use crate::template::lookup_path;

#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("unknown condition operator on field '{field}'")]
    UnknownOperator { field: String },
}

/// Evaluate all conditions against the payload.  An empty list is `true`.
pub fn evaluate(conditions: &[Condition], payload: &Value) -> Result<bool, ConditionError> {
    for condition in conditions {
        if !evaluate_one(condition, payload)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate_one(condition: &Condition, payload: &Value) -> Result<bool, ConditionError> {
    let extracted = lookup_path(payload, &condition.field);

    let result = match condition.operator {
        Operator::Equals => extracted == Some(&condition.value),
        Operator::NotEquals => extracted != Some(&condition.value),
        Operator::Contains => match extracted {
            Some(value) => as_text(value).contains(&as_text(&condition.value)),
            None => false,
        },
        Operator::GreaterThan => {
            numeric_cmp(extracted, &condition.value) == Some(Ordering::Greater)
        }
        Operator::LessThan => numeric_cmp(extracted, &condition.value) == Some(Ordering::Less),
        Operator::Exists => matches!(extracted, Some(v) if !v.is_null()),
        Operator::Unknown => {
            return Err(ConditionError::UnknownOperator {
                field: condition.field.clone(),
            })
        }
    };
    Ok(result)
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn numeric_cmp(extracted: Option<&Value>, expected: &Value) -> Option<Ordering> {
    let left = extracted?.as_f64()?;
    let right = expected.as_f64()?;
    left.partial_cmp(&right)
}
