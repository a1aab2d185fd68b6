use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use engine::{Workflow, WorkflowDefinition, WorkflowPatch};

use super::{status_for, AppState};

/// A workflow plus the webhook path advertised for it, when its trigger is
/// a webhook.
#[derive(Serialize)]
pub struct WorkflowResponse {
    #[serde(flatten)]
    pub workflow: Workflow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_path: Option<String>,
}

async fn with_webhook_path(state: &AppState, workflow: Workflow) -> WorkflowResponse {
    let webhook_path = state
        .registry
        .webhook_binding(workflow.id)
        .await
        .map(|b| b.path);
    WorkflowResponse {
        workflow,
        webhook_path,
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Workflow>>, StatusCode> {
    match state.registry.list().await {
        Ok(workflows) => Ok(Json(workflows)),
        Err(e) => Err(status_for(&e)),
    }
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    match state.registry.get(id).await {
        Ok(workflow) => Ok(Json(with_webhook_path(&state, workflow).await)),
        Err(e) => Err(status_for(&e)),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(definition): Json<WorkflowDefinition>,
) -> Result<(StatusCode, Json<WorkflowResponse>), StatusCode> {
    match state.registry.create(definition).await {
        Ok(workflow) => Ok((
            StatusCode::CREATED,
            Json(with_webhook_path(&state, workflow).await),
        )),
        Err(e) => Err(status_for(&e)),
    }
}

pub async fn update(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(patch): Json<WorkflowPatch>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    match state.registry.update(id, patch).await {
        Ok(workflow) => Ok(Json(with_webhook_path(&state, workflow).await)),
        Err(e) => Err(status_for(&e)),
    }
}

pub async fn delete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    match state.registry.delete(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(status_for(&e)),
    }
}
