use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use store::ExecutionRecord;

use super::{status_for, AppState};

/// Header carrying the shared secret declared at binding time.
const SECRET_HEADER: &str = "x-webhook-secret";

/// Inbound webhook delivery: resolve the binding, enforce method and
/// secret, and run the bound workflow with the request body as payload.
pub async fn handle_webhook(
    Path(webhook_id): Path<Uuid>,
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ExecutionRecord>, StatusCode> {
    let payload: Value = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?
    };

    let secret = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    match state
        .engine
        .trigger_webhook(webhook_id, method.as_str(), secret, payload)
        .await
    {
        Ok(execution) => Ok(Json(execution)),
        Err(e) => Err(status_for(&e)),
    }
}
