//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the workflow engine (validation + trigger handling).
///
/// Action failures are deliberately *not* here — they are recorded as step
/// data on the execution record, and `stop_on_error` decides whether a run
/// halts.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// The definition is malformed: unknown action type or condition
    /// operator, invalid schedule expression or timezone, and so on.
    /// Surfaced at workflow create/update time, never deferred to run time.
    #[error("configuration error: {0}")]
    Configuration(String),

    // ------ Trigger errors ------

    /// The workflow id does not exist.
    #[error("workflow not found")]
    WorkflowNotFound,

    /// The workflow exists but is disabled; no execution record is created.
    #[error("workflow is disabled")]
    WorkflowDisabled,

    /// No binding exists for the given webhook id.
    #[error("trigger not found")]
    TriggerNotFound,

    /// The webhook binding accepts a different HTTP method.
    #[error("method not allowed, binding accepts {expected}")]
    MethodNotAllowed { expected: String },

    /// The caller-supplied secret does not match the binding's secret.
    #[error("invalid webhook secret")]
    InvalidSecret,

    // ------ Persistence ------

    /// Storage error from the store crate.
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),
}
