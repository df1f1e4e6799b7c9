//! Network-segmented internal surface consumed by Build Worker and Deploy
//! Engine (spec.md §6 "Control Plane internal (unauth; network-segmented)").

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post, put},
    Json, Router,
};
use paas_core::problemdetails::Problem;
use paas_core::types::BuildStatus;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::dto::{InternalBuildStatusRequestBody, InternalLogRequestBody};
use crate::log_sink::DbLogSink;
use crate::services::{builds, deployments, env_vars};
use crate::state::AppState;
use paas_logs::LogSink;

#[derive(OpenApi)]
#[openapi(
    paths(append_build_logs, set_build_status, drain_queue),
    components(schemas(InternalLogRequestBody, InternalBuildStatusRequestBody)),
    tags((name = "Internal", description = "Build Worker / Deploy Engine callbacks"))
)]
pub struct InternalApiDoc;

#[utoipa::path(
    post,
    path = "/builds/{id}/logs",
    request_body = InternalLogRequestBody,
    responses((status = 202, description = "Log line accepted")),
    params(("id" = Uuid, Path)),
    tag = "Internal"
)]
async fn append_build_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<InternalLogRequestBody>,
) -> Result<impl IntoResponse, Problem> {
    let sink = DbLogSink::new(state.db.clone());
    state
        .log_hub
        .publish(&sink, id, body.level, &body.logs)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// `PUT /builds/:id` — sets the build's status, triggering
/// auto-activation on `success` (spec.md §6). A failed auto-activation is
/// logged into the build's own log stream rather than reverting the
/// build's (already terminal) status.
#[utoipa::path(
    put,
    path = "/builds/{id}",
    request_body = InternalBuildStatusRequestBody,
    responses((status = 200, description = "Status updated")),
    params(("id" = Uuid, Path)),
    tag = "Internal"
)]
async fn set_build_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<InternalBuildStatusRequestBody>,
) -> Result<impl IntoResponse, Problem> {
    let build = builds::set_build_status(&state.db, &state.queue, id, body.status).await?;

    if body.status.is_terminal() {
        state.log_hub.close_topic(id);
    }

    if body.status == BuildStatus::Success {
        let env = env_vars::decrypted_env_map(&state.db, &state.encryption, build.project_id)
            .await
            .unwrap_or_default();

        if let Err(err) =
            deployments::activate_build(&state.db, state.deployer.as_ref(), id, env).await
        {
            let sink = DbLogSink::new(state.db.clone());
            let _ = sink
                .persist(
                    id,
                    paas_core::LogLevel::Error,
                    &format!("auto-activation failed: {err}"),
                )
                .await;
        }
    }

    info!(build_id = %id, status = %body.status, "build status updated");
    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/builds/queue",
    responses((status = 204, description = "Queue drained")),
    tag = "Internal"
)]
async fn drain_queue() -> impl IntoResponse {
    // The in-process `BuildQueue` has no drain primitive by design: a
    // build already taken by the worker loop cannot be un-taken. This
    // endpoint exists for operational parity with the REST surface and
    // is a no-op until a persistent queue backend replaces the in-memory
    // channel.
    StatusCode::NO_CONTENT
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/builds/{id}/logs", post(append_build_logs))
        .route("/builds/{id}", put(set_build_status))
        .route("/builds/queue", delete(drain_queue))
}
