//! The `Action` model.
//!
//! Defined here (in the actions crate) so both the engine and individual
//! handler implementations can import it without a circular dependency.
//! Workflows in the engine crate embed `Vec<Action>`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step in a workflow's pipeline: the typed parameters plus the
/// `stop_on_error` flag shared by every kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    /// When true, a failure of this action halts the run and marks it
    /// `failed`.  When false (default) the run continues and can still end
    /// `completed` even though this step recorded an error.
    #[serde(default)]
    pub stop_on_error: bool,
}

/// Mutation applied by a `database` action (and matched by `data_change`
/// triggers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOperation {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for DataOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Typed action variants.  String parameters may contain `{{path}}`
/// placeholders; the engine interpolates them against the trigger payload
/// and prior step outputs before dispatch.
///
/// An unrecognised `type` tag deserialises to [`ActionKind::Unknown`],
/// which validation rejects at create/update time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    HttpRequest {
        url: String,
        #[serde(default = "default_http_method")]
        method: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        body: Option<String>,
    },
    Email {
        to: String,
        subject: String,
        body: String,
    },
    Sms {
        to: String,
        message: String,
    },
    Slack {
        webhook_url: String,
        message: String,
        #[serde(default)]
        channel: Option<String>,
    },
    Discord {
        webhook_url: String,
        message: String,
    },
    Teams {
        webhook_url: String,
        message: String,
    },
    Notification {
        title: String,
        message: String,
        #[serde(default)]
        recipient: Option<String>,
    },
    Database {
        table: String,
        operation: DataOperation,
        /// Record to insert, or patch to apply on update.
        #[serde(default)]
        record: Value,
        /// Equality filter for update/delete.
        #[serde(default)]
        filter: Value,
    },
    Webhook {
        url: String,
        /// Body to POST; the trigger payload is sent when omitted.
        #[serde(default)]
        payload: Option<Value>,
    },
    Script {
        source: String,
    },
    #[serde(other)]
    Unknown,
}

fn default_http_method() -> String {
    "GET".to_string()
}

impl ActionKind {
    /// The serde tag, used as the registry key and on step records.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::HttpRequest { .. } => "http_request",
            Self::Email { .. } => "email",
            Self::Sms { .. } => "sms",
            Self::Slack { .. } => "slack",
            Self::Discord { .. } => "discord",
            Self::Teams { .. } => "teams",
            Self::Notification { .. } => "notification",
            Self::Database { .. } => "database",
            Self::Webhook { .. } => "webhook",
            Self::Script { .. } => "script",
            Self::Unknown => "unknown",
        }
    }
}
