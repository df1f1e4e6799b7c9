//! Wire DTOs exchanged between Control Plane and Deploy Engine (spec.md §6
//! "Deploy Engine" endpoint table). Plain `Serialize`/`Deserialize` structs,
//! matching the teacher's cross-process `BuildRequest`/`DeployRequest`
//! convention rather than the in-process service traits used elsewhere.

use std::collections::HashMap;

use paas_core::types::Framework;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortCheckResponse {
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateRequest {
    pub project_id: Uuid,
    pub build_id: Uuid,
    pub port: u16,
    pub app_type: Framework,
    pub subdomain: Option<String>,
    pub env_vars: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateResponse {
    pub healthy: bool,
    pub proxy_configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub port: u16,
    pub project_id: Option<Uuid>,
    pub build_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectRequest {
    pub project_id: Uuid,
    pub port: Option<u16>,
    pub subdomain: Option<String>,
    pub build_ids: Vec<Uuid>,
}
