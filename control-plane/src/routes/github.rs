//! GitHub integration surface: installation/repository listing and the
//! signature-verified webhook endpoint (spec.md §4.4, §6).

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use paas_core::error_builder::ErrorBuilder;
use paas_core::problemdetails::Problem;
use paas_git::webhook_event::WebhookEvent;
use paas_git::{verify_signature, InstallationTokenExchange};
use tracing::warn;
use utoipa::OpenApi;

use crate::dto::{InstallationResponse, RepositoryResponse, WebhookResponseBody};
use crate::services::webhook::handle_webhook_event;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_installations, list_installation_repositories, receive_webhook),
    components(schemas(InstallationResponse, RepositoryResponse, WebhookResponseBody)),
    tags((name = "GitHub", description = "Source-control app integration"))
)]
pub struct GitHubApiDoc;

fn github_app_exchange(state: &AppState) -> Result<InstallationTokenExchange, Problem> {
    let app_id = state
        .config
        .github_app_id
        .clone()
        .ok_or_else(|| not_configured("GITHUB_APP_ID is not configured"))?;
    let key_path = state
        .config
        .github_app_private_key_path
        .clone()
        .ok_or_else(|| not_configured("GITHUB_APP_PRIVATE_KEY_PATH is not configured"))?;
    let private_key = std::fs::read_to_string(&key_path)
        .map_err(|e| not_configured(format!("failed to read GitHub App private key: {e}")))?;
    Ok(InstallationTokenExchange::new(app_id, private_key))
}

fn not_configured(detail: impl Into<String>) -> Problem {
    ErrorBuilder::new(StatusCode::SERVICE_UNAVAILABLE)
        .type_("https://errors.example/probs/upstream-failure")
        .title("GitHub App Not Configured")
        .detail(detail)
        .build()
}

#[utoipa::path(
    get,
    path = "/github/installations",
    responses((status = 200, description = "App installations", body = Vec<InstallationResponse>)),
    tag = "GitHub"
)]
async fn list_installations(State(state): State<AppState>) -> Result<impl IntoResponse, Problem> {
    let exchange = github_app_exchange(&state)?;
    let client = reqwest::Client::new();
    let now = chrono::Utc::now().timestamp();

    let installations = paas_git::list_installations(&exchange, &client, now)
        .await
        .map_err(|e| ErrorBuilder::new(StatusCode::BAD_GATEWAY)
            .type_("https://errors.example/probs/upstream-failure")
            .title("Upstream Failure")
            .detail(e.to_string())
            .build())?;

    Ok(Json(
        installations
            .into_iter()
            .map(|i| InstallationResponse {
                id: i.id.to_string(),
                account_login: i.account.login,
            })
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/github/installations/{id}/repositories",
    responses((status = 200, description = "Repositories accessible to an installation", body = Vec<RepositoryResponse>)),
    params(("id" = String, Path)),
    tag = "GitHub"
)]
async fn list_installation_repositories(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Problem> {
    let exchange = github_app_exchange(&state)?;
    let client = reqwest::Client::new();
    let now = chrono::Utc::now().timestamp();

    let token = exchange.exchange(&id, now).await.map_err(|e| {
        ErrorBuilder::new(StatusCode::BAD_GATEWAY)
            .type_("https://errors.example/probs/upstream-failure")
            .title("Upstream Failure")
            .detail(e.to_string())
            .build()
    })?;

    let repos = paas_git::list_installation_repositories(&client, &token)
        .await
        .map_err(|e| ErrorBuilder::new(StatusCode::BAD_GATEWAY)
            .type_("https://errors.example/probs/upstream-failure")
            .title("Upstream Failure")
            .detail(e.to_string())
            .build())?;

    Ok(Json(
        repos
            .into_iter()
            .map(|r| RepositoryResponse {
                id: r.id.to_string(),
                name: r.name,
                full_name: r.full_name,
                default_branch: r.default_branch,
                private: r.private,
            })
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/github/webhook",
    responses(
        (status = 200, description = "Webhook processed", body = WebhookResponseBody),
        (status = 401, description = "Missing or invalid signature")
    ),
    tag = "GitHub"
)]
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Problem> {
    let signature_header = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok());

    verify_signature(&state.config.github_webhook_secret, signature_header, &body).map_err(
        |e| {
            ErrorBuilder::new(StatusCode::UNAUTHORIZED)
                .type_("https://errors.example/probs/unauthorized")
                .title("Unauthorized")
                .detail(e.to_string())
                .build()
        },
    )?;

    let event_type = headers
        .get("X-Github-Event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let event = match WebhookEvent::parse(event_type, &body) {
        Ok(event) => event,
        Err(err) => {
            warn!(%err, "failed to parse webhook payload, ignoring");
            return Ok(Json(WebhookResponseBody {
                processed: 0,
                builds_triggered: 0,
                builds_skipped: 0,
            }));
        }
    };

    let summary = handle_webhook_event(
        &state.db,
        &state.encryption,
        &state.queue,
        &state.http_client,
        &state.config.build_worker_url,
        event,
    )
    .await;
    Ok(Json(WebhookResponseBody::from(summary)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/github/installations", get(list_installations))
        .route(
            "/github/installations/{id}/repositories",
            get(list_installation_repositories),
        )
        .route("/github/webhook", post(receive_webhook))
}
