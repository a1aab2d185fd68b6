//! The `ActionHandler` trait — the contract every action handler must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::{ActionError, ActionKind};

/// Shared context passed to every handler during dispatch.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// ID of the parent workflow.
    pub workflow_id: uuid::Uuid,
    /// ID of the current execution run.
    pub execution_id: uuid::Uuid,
    /// The trigger payload that started the run.
    pub payload: Value,
    /// Merged template context: payload fields at the root plus `trigger`
    /// and the `steps` array of prior step outputs.
    pub context: Value,
}

/// The core handler trait.
///
/// The action passed in has already been interpolated — handlers see final
/// parameter values, never `{{placeholders}}`.  Handlers return a structured
/// output object on success; failures are data for the step result, so they
/// must come back as [`ActionError`], never panics.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, action: &ActionKind, ctx: &ActionContext)
        -> Result<Value, ActionError>;
}
