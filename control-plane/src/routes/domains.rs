//! `GET /domains/check` (spec.md §6).

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use paas_core::problemdetails::Problem;
use paas_entities::projects::{self, Entity as Projects};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

use crate::dto::DomainCheckResponse;
use crate::services::projects::is_subdomain_available;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DomainCheckQuery {
    pub subdomain: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(check_domain),
    components(schemas(DomainCheckResponse)),
    tags((name = "Domains", description = "Subdomain availability checks"))
)]
pub struct DomainsApiDoc;

#[utoipa::path(
    get,
    path = "/domains/check",
    params(DomainCheckQuery),
    responses((status = 200, description = "Availability", body = DomainCheckResponse)),
    tag = "Domains"
)]
async fn check_domain(
    State(state): State<AppState>,
    Query(query): Query<DomainCheckQuery>,
) -> Result<impl IntoResponse, Problem> {
    let existing: std::collections::HashSet<String> = Projects::find()
        .filter(projects::Column::Domain.is_not_null())
        .all(&state.db)
        .await
        .map_err(|e| paas_core::ServiceError::database(e.to_string()))?
        .into_iter()
        .filter_map(|p| p.domain.and_then(|d| d.split('.').next().map(str::to_string)))
        .collect();

    let available = is_subdomain_available(&query.subdomain, &existing);
    Ok(Json(DomainCheckResponse { available }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/domains/check", get(check_domain))
}
