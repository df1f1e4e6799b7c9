//! `POST /deploy/build/:id/activate` (spec.md §6).

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use paas_core::problemdetails::Problem;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::dto::DeploymentResponse;
use crate::services::{deployments, env_vars};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(activate_build),
    components(schemas(DeploymentResponse)),
    tags((name = "Deploy", description = "Build activation"))
)]
pub struct DeployApiDoc;

#[utoipa::path(
    post,
    path = "/deploy/build/{id}/activate",
    responses(
        (status = 200, description = "Build activated as the project's deployment", body = DeploymentResponse),
        (status = 409, description = "Deployment failed (port occupied, failed health check)")
    ),
    params(("id" = Uuid, Path)),
    tag = "Deploy"
)]
async fn activate_build(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    let build = crate::services::builds::get_build(&state.db, id).await?;
    let env = env_vars::decrypted_env_map(&state.db, &state.encryption, build.project_id).await?;
    let deployment =
        deployments::activate_build(&state.db, state.deployer.as_ref(), id, env).await?;
    Ok(Json(DeploymentResponse::from(deployment)))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/deploy/build/{id}/activate", post(activate_build))
}
