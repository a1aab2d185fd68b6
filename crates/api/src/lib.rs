//! `api` crate — HTTP REST API layer.
//!
//! Exposes:
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows
//!   GET    /api/v1/workflows/{id}
//!   PATCH  /api/v1/workflows/{id}
//!   DELETE /api/v1/workflows/{id}
//!   POST   /api/v1/workflows/{id}/execute
//!   GET    /api/v1/workflows/{id}/executions
//!   DELETE /api/v1/workflows/{id}/executions
//!   GET    /api/v1/executions
//!   GET    /api/v1/executions/{id}
//!   DELETE /api/v1/executions
//!   ANY    /api/webhooks/{webhook_id}

pub mod handlers;

use axum::routing::{any, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use handlers::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/workflows",
            get(handlers::workflows::list).post(handlers::workflows::create),
        )
        .route(
            "/api/v1/workflows/:id",
            get(handlers::workflows::get)
                .patch(handlers::workflows::update)
                .delete(handlers::workflows::delete),
        )
        .route(
            "/api/v1/workflows/:id/execute",
            post(handlers::executions::execute),
        )
        .route(
            "/api/v1/workflows/:id/executions",
            get(handlers::executions::list_for_workflow)
                .delete(handlers::executions::clear_for_workflow),
        )
        .route(
            "/api/v1/executions",
            get(handlers::executions::list_recent).delete(handlers::executions::clear_all),
        )
        .route(
            "/api/v1/executions/:id",
            get(handlers::executions::get),
        )
        .route("/api/webhooks/:id", any(handlers::webhooks::handle_webhook))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {bind}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
