//! Action-level error type.

use thiserror::Error;

/// Errors surfaced by an action dispatch.
///
/// These never abort the run loop by themselves — they are recorded on the
/// step result, and the per-action `stop_on_error` flag decides whether the
/// engine halts.  `Timeout` and `Cancelled` are produced by the dispatcher,
/// not by handlers.
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// The handler itself failed.
    #[error("action failed: {0}")]
    Failed(String),

    /// The handler did not finish within the per-action deadline.
    #[error("action timed out")]
    Timeout,

    /// The run was cancelled before this action could finish.
    #[error("execution cancelled")]
    Cancelled,
}

impl ActionError {
    /// Stable failure-kind label recorded on step results.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}
