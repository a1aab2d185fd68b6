//! Definition validation — run this before persisting a workflow.
//!
//! Configuration mistakes (unknown action types, unknown condition
//! operators, invalid schedule expressions) must surface at create/update
//! time, not when a trigger eventually fires.

use actions::{Action, ActionKind};

use crate::models::{Condition, Operator, Trigger, WorkflowDefinition};
use crate::scheduler;
use crate::EngineError;

const WEBHOOK_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Parse and validate a JSON workflow definition (the CLI `validate`
/// entry point).
pub fn validate_definition_file(content: &str) -> Result<WorkflowDefinition, EngineError> {
    let definition: WorkflowDefinition = serde_json::from_str(content)
        .map_err(|e| EngineError::Configuration(format!("invalid definition JSON: {e}")))?;
    validate_definition(
        &definition.name,
        &definition.trigger,
        &definition.conditions,
        &definition.actions,
    )?;
    Ok(definition)
}

/// Validate a full definition (used for both create and the merged result
/// of an update).
///
/// # Errors
/// [`EngineError::Configuration`] describing the first problem found.
pub fn validate_definition(
    name: &str,
    trigger: &Trigger,
    conditions: &[Condition],
    actions: &[Action],
) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::Configuration(
            "workflow name must not be empty".into(),
        ));
    }

    validate_trigger(trigger)?;
    validate_conditions(conditions)?;

    for (index, action) in actions.iter().enumerate() {
        validate_action(index, action)?;
    }

    Ok(())
}

fn validate_trigger(trigger: &Trigger) -> Result<(), EngineError> {
    match trigger {
        Trigger::Webhook { method, .. } => {
            let method = method.to_uppercase();
            if !WEBHOOK_METHODS.contains(&method.as_str()) {
                return Err(EngineError::Configuration(format!(
                    "unsupported webhook method '{method}'"
                )));
            }
        }
        Trigger::Schedule { expression, timezone } => {
            scheduler::parse_schedule(expression)?;
            scheduler::parse_timezone(timezone)?;
        }
        Trigger::DataChange { table, conditions, .. } => {
            if table.trim().is_empty() {
                return Err(EngineError::Configuration(
                    "data_change trigger requires a table".into(),
                ));
            }
            validate_conditions(conditions)?;
        }
        Trigger::Manual | Trigger::Api => {}
    }
    Ok(())
}

fn validate_conditions(conditions: &[Condition]) -> Result<(), EngineError> {
    for condition in conditions {
        if condition.operator == Operator::Unknown {
            return Err(EngineError::Configuration(format!(
                "unknown condition operator on field '{}'",
                condition.field
            )));
        }
        if condition.field.trim().is_empty() {
            return Err(EngineError::Configuration(
                "condition field must not be empty".into(),
            ));
        }
    }
    Ok(())
}

fn validate_action(index: usize, action: &Action) -> Result<(), EngineError> {
    match &action.kind {
        ActionKind::Unknown => Err(EngineError::Configuration(format!(
            "action {index} has an unknown type"
        ))),
        ActionKind::HttpRequest { url, method, .. } => {
            if url.trim().is_empty() {
                return Err(EngineError::Configuration(format!(
                    "action {index} (http_request) requires a url"
                )));
            }
            let method = method.to_uppercase();
            if !WEBHOOK_METHODS.contains(&method.as_str()) && method != "HEAD" {
                return Err(EngineError::Configuration(format!(
                    "action {index} (http_request) has unsupported method '{method}'"
                )));
            }
            Ok(())
        }
        ActionKind::Webhook { url, .. } if url.trim().is_empty() => Err(
            EngineError::Configuration(format!("action {index} (webhook) requires a url")),
        ),
        ActionKind::Script { source } if source.trim().is_empty() => Err(
            EngineError::Configuration(format!("action {index} (script) requires a source")),
        ),
        _ => Ok(()),
    }
}
