//! Request handlers and shared application state.

pub mod executions;
pub mod webhooks;
pub mod workflows;

use std::sync::Arc;

use axum::http::StatusCode;

use engine::{EngineError, ExecutionEngine, WorkflowRegistry};
use store::ExecutionLedger;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WorkflowRegistry>,
    pub engine: Arc<ExecutionEngine>,
    pub ledger: Arc<dyn ExecutionLedger>,
}

/// Map engine errors onto HTTP statuses.
pub(crate) fn status_for(error: &EngineError) -> StatusCode {
    match error {
        EngineError::Configuration(_) => StatusCode::BAD_REQUEST,
        EngineError::WorkflowNotFound | EngineError::TriggerNotFound => StatusCode::NOT_FOUND,
        EngineError::WorkflowDisabled => StatusCode::CONFLICT,
        EngineError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        EngineError::InvalidSecret => StatusCode::UNAUTHORIZED,
        EngineError::Store(store::StoreError::NotFound) => StatusCode::NOT_FOUND,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
