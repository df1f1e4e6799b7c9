//! HTTP surface (spec.md §6 "Deploy Engine"): `/ports/check`,
//! `/artifacts/upload`, `/activate`, `/stop`, `/projects/delete`,
//! `/health`, `/ready`.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use paas_deployer::{ActivateRequest, ActivateResponse, DeleteProjectRequest, PortCheckResponse, StopRequest};
use serde::Deserialize;
use tracing::error;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::activate::{activate, ActivationRequest};
use crate::ops;
use crate::port_check::is_port_available;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(check_port, upload_artifact, activate_route, stop_route, delete_project_route, health, ready),
    components(schemas(PortCheckResponse, ActivateRequest, ActivateResponse, StopRequest, DeleteProjectRequest)),
    tags((name = "Deploy Engine", description = "Single-host build activation agent"))
)]
pub struct DeployEngineApiDoc;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PortCheckRequestBody {
    port: u16,
}

#[utoipa::path(post, path = "/ports/check", request_body = PortCheckRequestBody, responses((status = 200, body = PortCheckResponse)), tag = "Deploy Engine")]
async fn check_port(Json(body): Json<PortCheckRequestBody>) -> Json<PortCheckResponse> {
    Json(PortCheckResponse {
        available: is_port_available(body.port).await,
    })
}

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(rename = "buildId")]
    build_id: Uuid,
}

#[utoipa::path(post, path = "/artifacts/upload", responses((status = 201, description = "Artifact stored")), tag = "Deploy Engine")]
async fn upload_artifact(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    if let Err(err) = tokio::fs::create_dir_all(&state.config.artifacts_dir).await {
        error!(%err, "failed to create artifacts directory");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    let path = paas_deployer::packaging::artifact_path(&state.config.artifacts_dir, query.build_id);
    match tokio::fs::write(&path, &body).await {
        Ok(()) => StatusCode::CREATED,
        Err(err) => {
            error!(%err, build_id = %query.build_id, "failed to store uploaded artifact");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[utoipa::path(post, path = "/activate", request_body = ActivateRequest, responses((status = 200, body = ActivateResponse), (status = 409, description = "Activation failed")), tag = "Deploy Engine")]
async fn activate_route(
    State(state): State<AppState>,
    Json(body): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>, StatusCode> {
    let request = ActivationRequest {
        project_id: body.project_id,
        build_id: body.build_id,
        port: body.port,
        framework: body.app_type,
        subdomain: body.subdomain,
        env_vars: body.env_vars,
    };

    match activate(&state, request).await {
        Ok(outcome) => Ok(Json(ActivateResponse {
            healthy: outcome.healthy,
            proxy_configured: outcome.proxy_configured,
        })),
        Err(err) => {
            error!(%err, "activation failed");
            Err(StatusCode::CONFLICT)
        }
    }
}

#[utoipa::path(post, path = "/stop", request_body = StopRequest, responses((status = 200)), tag = "Deploy Engine")]
async fn stop_route(State(state): State<AppState>, Json(body): Json<StopRequest>) -> StatusCode {
    let Some(project_id) = body.project_id else {
        return StatusCode::BAD_REQUEST;
    };
    ops::stop_project(&state, project_id, body.port).await;
    StatusCode::OK
}

#[utoipa::path(
    post,
    path = "/projects/{id}/delete",
    request_body = DeleteProjectRequest,
    params(("id" = Uuid, Path)),
    responses((status = 200)),
    tag = "Deploy Engine"
)]
async fn delete_project_route(
    State(state): State<AppState>,
    axum::extract::Path(_id): axum::extract::Path<Uuid>,
    Json(body): Json<DeleteProjectRequest>,
) -> StatusCode {
    ops::delete_project(
        &state,
        body.project_id,
        body.port,
        body.subdomain.as_deref(),
        &body.build_ids,
    )
    .await;
    StatusCode::OK
}

#[utoipa::path(get, path = "/health", responses((status = 200)), tag = "Deploy Engine")]
async fn health() -> StatusCode {
    StatusCode::OK
}

#[utoipa::path(get, path = "/ready", responses((status = 200)), tag = "Deploy Engine")]
async fn ready(State(state): State<AppState>) -> StatusCode {
    if tokio::fs::metadata(&state.config.apps_dir).await.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ports/check", post(check_port))
        .route("/artifacts/upload", post(upload_artifact))
        .route("/activate", post(activate_route))
        .route("/stop", post(stop_route))
        .route("/projects/{id}/delete", post(delete_project_route))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::catch_panic::CatchPanicLayer::new())
        .with_state(state)
}
