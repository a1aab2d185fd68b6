//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory.  The definition body (trigger, conditions, actions, description)
//! serialises into the `definition` field of a stored `WorkflowRecord`;
//! the mutable statistics live in dedicated record fields.

use std::collections::HashMap;

use actions::{Action, DataOperation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use store::WorkflowRecord;
use uuid::Uuid;

use crate::EngineError;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// How a workflow is started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Triggered by an incoming HTTP request to the bound webhook path.
    Webhook {
        #[serde(default = "default_webhook_method")]
        method: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        /// Shared secret compared against the caller's `x-webhook-secret`
        /// header when set.
        #[serde(default)]
        secret: Option<String>,
    },
    /// Triggered on a cron schedule.
    Schedule {
        /// Cron expression (5 or 6 fields; a 5-field expression is treated
        /// as firing at second zero).
        expression: String,
        /// IANA timezone name the expression is evaluated in.
        #[serde(default = "default_timezone")]
        timezone: String,
    },
    /// Triggered when an external collaborator observes a matching data
    /// mutation.
    DataChange {
        table: String,
        operation: DataOperation,
        #[serde(default)]
        conditions: Vec<Condition>,
    },
    /// Triggered manually.
    Manual,
    /// Triggered via the REST API execute endpoint.
    Api,
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// Predicate operator over an extracted payload value.
///
/// An unrecognised operator string deserialises to [`Operator::Unknown`],
/// which validation rejects and the evaluator treats as an error — a
/// misconfigured condition must not look like a legitimately-unmet one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    Exists,
    Unknown,
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "contains" => Self::Contains,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "exists" => Self::Exists,
            _ => Self::Unknown,
        })
    }
}

/// One predicate over the trigger payload.  All of a workflow's conditions
/// are ANDed; an empty list means the workflow always proceeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path into the payload (`user.address.city`).
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow definition with its execution statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub trigger: Trigger,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    pub enabled: bool,
    pub execution_count: u64,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input shape for `WorkflowRegistry::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub trigger: Trigger,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Partial update for `WorkflowRegistry::update`; omitted fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default)]
    pub actions: Option<Vec<Action>>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// The part of a workflow that serialises into a record's `definition`.
#[derive(Serialize, Deserialize)]
struct DefinitionBody {
    #[serde(default)]
    description: Option<String>,
    trigger: Trigger,
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default)]
    actions: Vec<Action>,
}

impl Workflow {
    /// Rehydrate a domain workflow from its stored record.
    pub fn from_record(record: &WorkflowRecord) -> Result<Self, EngineError> {
        let body: DefinitionBody =
            serde_json::from_value(record.definition.clone()).map_err(|e| {
                EngineError::Configuration(format!(
                    "stored definition for workflow {} is invalid: {e}",
                    record.id
                ))
            })?;
        Ok(Self {
            id: record.id,
            name: record.name.clone(),
            description: body.description,
            trigger: body.trigger,
            conditions: body.conditions,
            actions: body.actions,
            enabled: record.enabled,
            execution_count: record.execution_count,
            last_executed_at: record.last_executed_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Serialise into the stored record shape.
    pub fn to_record(&self) -> Result<WorkflowRecord, EngineError> {
        let body = DefinitionBody {
            description: self.description.clone(),
            trigger: self.trigger.clone(),
            conditions: self.conditions.clone(),
            actions: self.actions.clone(),
        };
        let definition = serde_json::to_value(&body)
            .map_err(|e| EngineError::Configuration(format!("cannot serialise definition: {e}")))?;
        Ok(WorkflowRecord {
            id: self.id,
            name: self.name.clone(),
            definition,
            enabled: self.enabled,
            execution_count: self.execution_count,
            last_executed_at: self.last_executed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
