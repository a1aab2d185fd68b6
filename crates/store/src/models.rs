//! Record structs that map 1-to-1 onto stored aggregates.
//!
//! These are *persistence* models — they carry no domain behaviour.
//! Domain types live in the `engine` crate; the `definition` field of
//! [`WorkflowRecord`] holds the serialised domain definition while the
//! mutable statistics live in dedicated columns.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// workflows
// ---------------------------------------------------------------------------

/// A persisted workflow definition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: Uuid,
    pub name: String,
    /// Full JSON definition body (description, trigger, conditions, actions).
    pub definition: serde_json::Value,
    pub enabled: bool,
    pub execution_count: u64,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// executions
// ---------------------------------------------------------------------------

/// Possible statuses for a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Skipped,
    Failed,
}

impl ExecutionStatus {
    /// `completed`, `skipped`, and `failed` are terminal; the ledger only
    /// ever holds terminal records.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped | Self::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending"   => Ok(Self::Pending),
            "running"   => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "skipped"   => Ok(Self::Skipped),
            "failed"    => Ok(Self::Failed),
            other       => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Outcome of a single action within an execution, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub action_type: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub success: bool,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// One recorded run of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub trigger_payload: serde_json::Value,
    pub status: ExecutionStatus,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// bindings
// ---------------------------------------------------------------------------

/// Externally-addressable webhook endpoint bound to a workflow.
///
/// The `id` is derived deterministically from the workflow id, so repeated
/// binding attempts land on the same endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBinding {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub path: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub secret: Option<String>,
}

/// Cron schedule entry bound to a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBinding {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub expression: String,
    pub timezone: String,
    pub next_run_at: DateTime<Utc>,
    pub enabled: bool,
}

/// Declarative data-change subscription.
///
/// The binder does not watch a data store itself; an external change-data
/// -capture collaborator asks the binder which workflows match an observed
/// mutation.  `conditions` holds the serialised condition list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataChangeBinding {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub table: String,
    pub operation: String,
    pub conditions: serde_json::Value,
}
