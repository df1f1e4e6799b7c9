//! Fallback `POST /build` endpoint (spec.md §4.2: "Also exposes a
//! fallback HTTP `POST /build` for direct triggering (same payload
//! shape) — the fallback fires-and-forgets"), and the same endpoint
//! doubles as Control Plane's actual cross-process job dispatch
//! transport (see `crate::main` for why).

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use paas_core::types::BuildJobData;
use paas_queue::BuildQueue;
use tracing::warn;

#[derive(Clone)]
pub struct WorkerHttpState {
    pub queue: Arc<BuildQueue>,
}

async fn receive_build(
    State(state): State<WorkerHttpState>,
    Json(job): Json<BuildJobData>,
) -> StatusCode {
    let build_id = job.build_id;
    match state.queue.enqueue(job).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(err) => {
            warn!(%build_id, %err, "rejected build job (already in flight or queue closed)");
            StatusCode::CONFLICT
        }
    }
}

pub fn routes(state: WorkerHttpState) -> Router {
    Router::new()
        .route("/build", post(receive_build))
        .with_state(state)
}
