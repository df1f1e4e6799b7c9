//! `/builds` REST surface (spec.md §6).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use paas_core::problemdetails::Problem;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::dto::{BuildResponse, LogEntryResponse};
use crate::services::builds;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_build, get_build_logs, delete_build_logs),
    components(schemas(BuildResponse, LogEntryResponse)),
    tags((name = "Builds", description = "Build inspection and log retrieval"))
)]
pub struct BuildsApiDoc;

#[utoipa::path(
    get,
    path = "/builds/{id}",
    responses(
        (status = 200, description = "Build", body = BuildResponse),
        (status = 404, description = "Not found")
    ),
    params(("id" = Uuid, Path)),
    tag = "Builds"
)]
async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    let build = builds::get_build(&state.db, id).await?;
    Ok(Json(BuildResponse::from(build)))
}

#[utoipa::path(
    get,
    path = "/builds/{id}/logs",
    responses((status = 200, description = "Build logs ordered by timestamp", body = Vec<LogEntryResponse>)),
    params(("id" = Uuid, Path)),
    tag = "Builds"
)]
async fn get_build_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    let logs = builds::get_build_logs(&state.db, id).await?;
    Ok(Json(
        logs.into_iter()
            .map(LogEntryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    delete,
    path = "/builds/{id}/logs",
    responses((status = 204, description = "Build logs deleted")),
    params(("id" = Uuid, Path)),
    tag = "Builds"
)]
async fn delete_build_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    builds::delete_build_logs(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/builds/{id}", get(get_build))
        .route(
            "/builds/{id}/logs",
            get(get_build_logs).delete(delete_build_logs),
        )
}
