//! Liveness/readiness probes. `/ready` additionally checks the database
//! connection so an orchestrator won't route traffic before migrations
//! have run.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use sea_orm::ConnectionTrait;
use serde_json::json;

use crate::state::AppState;

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.execute_unprepared("SELECT 1").await {
        Ok(_) => Json(json!({ "status": "ready" })).into_response(),
        Err(err) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "reason": err.to_string() })),
        )
            .into_response(),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}
