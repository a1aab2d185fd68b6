use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use store::ExecutionRecord;

use super::{status_for, AppState};

const DEFAULT_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct ExecuteWorkflowDto {
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Manual invocation: run the workflow to its terminal state and return the
/// execution record.
pub async fn execute(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(dto): Json<ExecuteWorkflowDto>,
) -> Result<Json<ExecutionRecord>, StatusCode> {
    match state.engine.trigger(id, dto.payload).await {
        Ok(execution) => Ok(Json(execution)),
        Err(e) => Err(status_for(&e)),
    }
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ExecutionRecord>, StatusCode> {
    match state.ledger.get(id).await {
        Ok(execution) => Ok(Json(execution)),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

pub async fn list_for_workflow(
    Path(id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
    State(state): State<AppState>,
) -> Json<Vec<ExecutionRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(state.ledger.recent(id, limit).await)
}

pub async fn list_recent(
    Query(query): Query<LimitQuery>,
    State(state): State<AppState>,
) -> Json<Vec<ExecutionRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(state.ledger.recent_all(limit).await)
}

pub async fn clear_for_workflow(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Json<Value> {
    let removed = state.ledger.clear(Some(id)).await;
    Json(json!({ "removed": removed }))
}

pub async fn clear_all(State(state): State<AppState>) -> Json<Value> {
    let removed = state.ledger.clear(None).await;
    Json(json!({ "removed": removed }))
}
