//! `/projects` REST surface (spec.md §6). The dashboard's own session
//! authentication is an out-of-scope external collaborator; these
//! handlers assume a trusted caller in front of them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use paas_core::error_builder::ErrorBuilder;
use paas_core::problemdetails::Problem;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::dto::{
    BuildResponse, CreateBuildRequestBody, CreateProjectRequestBody, DeploymentResponse,
    EnvVarResponse, ProjectResponse, SetEnvVarRequestBody, UpdateProjectRequestBody,
};
use crate::services::{builds, deployments, env_vars, projects as project_service};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_projects,
        create_project,
        get_project,
        update_project,
        delete_project,
        get_active_deployment,
        stop_project,
        create_build,
        list_builds,
        list_env_vars,
        set_env_var,
        delete_env_var,
    ),
    components(schemas(
        ProjectResponse,
        CreateProjectRequestBody,
        UpdateProjectRequestBody,
        BuildResponse,
        CreateBuildRequestBody,
        DeploymentResponse,
        EnvVarResponse,
        SetEnvVarRequestBody,
    )),
    tags((name = "Projects", description = "Project, build, deployment, and env var management"))
)]
pub struct ProjectsApiDoc;

#[utoipa::path(
    get,
    path = "/projects",
    responses((status = 200, description = "All projects", body = Vec<ProjectResponse>)),
    tag = "Projects"
)]
async fn list_projects(State(state): State<AppState>) -> Result<impl IntoResponse, Problem> {
    let projects = project_service::list_projects(&state.db).await?;
    Ok(Json(
        projects
            .into_iter()
            .map(ProjectResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequestBody,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Validation error")
    ),
    tag = "Projects"
)]
async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequestBody>,
) -> Result<impl IntoResponse, Problem> {
    let project = project_service::create_project(
        &state.db,
        state.deployer.as_ref(),
        project_service::CreateProjectInput {
            name: body.name,
            repo_url: body.github_url,
            repo_id: body.github_repo_id,
            default_branch: body.github_branch,
            root_directory: body.root_directory,
            build_command: body.build_command,
            framework: body.app_type,
            domain: body.domain,
            installation_id: body.github_installation_id,
            auto_deploy: body.auto_deploy,
        },
    )
    .await?;

    if let Some(initial_env_vars) = body.env_vars {
        for (key, value) in initial_env_vars {
            env_vars::set_env_var(&state.db, &state.encryption, project.id, key, &value).await?;
        }
    }

    info!(project_id = %project.id, "created project");
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    responses(
        (status = 200, description = "Project", body = ProjectResponse),
        (status = 404, description = "Not found")
    ),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    let project = project_service::get_project(&state.db, id).await?;
    Ok(Json(ProjectResponse::from(project)))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    request_body = UpdateProjectRequestBody,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 404, description = "Not found")
    ),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProjectRequestBody>,
) -> Result<impl IntoResponse, Problem> {
    let project = project_service::update_project(
        &state.db,
        id,
        project_service::UpdateProjectInput {
            name: body.name,
            build_command: body.build_command,
            root_directory: body.root_directory,
            auto_deploy: body.auto_deploy,
        },
    )
    .await?;
    Ok(Json(ProjectResponse::from(project)))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    responses(
        (status = 204, description = "Project deleted"),
        (status = 404, description = "Not found")
    ),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    project_service::delete_project(&state.db, state.deployer.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/projects/{id}/deployment",
    responses(
        (status = 200, description = "Active deployment", body = DeploymentResponse),
        (status = 404, description = "No active deployment")
    ),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn get_active_deployment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    match deployments::get_active_deployment(&state.db, id).await? {
        Some(deployment) => Ok(Json(DeploymentResponse::from(deployment))),
        None => Err(ErrorBuilder::new(StatusCode::NOT_FOUND)
            .type_("https://errors.example/probs/not-found")
            .title("Not Found")
            .detail(format!("project {id} has no active deployment"))
            .build()),
    }
}

#[utoipa::path(
    post,
    path = "/projects/{id}/stop",
    responses((status = 204, description = "Deployment stopped")),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn stop_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    deployments::stop_deployment(&state.db, state.deployer.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/projects/{id}/builds",
    request_body = CreateBuildRequestBody,
    responses((status = 201, description = "Build created", body = BuildResponse)),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn create_build(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateBuildRequestBody>,
) -> Result<impl IntoResponse, Problem> {
    let build = builds::create_build(
        &state.db,
        &state.encryption,
        &state.queue,
        &state.http_client,
        &state.config.build_worker_url,
        builds::CreateBuildInput {
            project_id: id,
            commit_sha: body.commit_sha,
            commit_message: body.commit_message,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(BuildResponse::from(build))))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/builds",
    responses((status = 200, description = "Builds for project", body = Vec<BuildResponse>)),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn list_builds(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    let builds = builds::list_builds_for_project(&state.db, id).await?;
    Ok(Json(
        builds
            .into_iter()
            .map(BuildResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/env",
    responses((status = 200, description = "Env vars (keys only)", body = Vec<EnvVarResponse>)),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn list_env_vars(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    let vars = env_vars::list_env_vars(&state.db, id).await?;
    Ok(Json(
        vars.into_iter()
            .map(EnvVarResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/projects/{id}/env",
    request_body = SetEnvVarRequestBody,
    responses((status = 200, description = "Env var set", body = EnvVarResponse)),
    params(("id" = Uuid, Path)),
    tag = "Projects"
)]
async fn set_env_var(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetEnvVarRequestBody>,
) -> Result<impl IntoResponse, Problem> {
    let var =
        env_vars::set_env_var(&state.db, &state.encryption, id, body.key, &body.value).await?;
    Ok(Json(EnvVarResponse::from(var)))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}/env/{key}",
    responses((status = 204, description = "Env var deleted")),
    params(("id" = Uuid, Path), ("key" = String, Path)),
    tag = "Projects"
)]
async fn delete_env_var(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, Problem> {
    env_vars::delete_env_var(&state.db, id, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/{id}/deployment", get(get_active_deployment))
        .route("/projects/{id}/stop", post(stop_project))
        .route("/projects/{id}/builds", get(list_builds).post(create_build))
        .route(
            "/projects/{id}/env",
            get(list_env_vars).post(set_env_var),
        )
        .route("/projects/{id}/env/{key}", axum::routing::delete(delete_env_var))
}
