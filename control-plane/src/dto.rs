//! Wire DTOs for the Control Plane REST surface (spec.md §6). Kept
//! separate from the entity models so an internal column (e.g.
//! `projects.port`) can be dropped from a public response without
//! touching persistence.

use std::collections::HashMap;

use paas_core::types::{BuildStatus, DeploymentStatus, Framework, LogLevel};
use paas_entities::{builds, deployments, environment_variables, log_entries, projects};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub github_url: String,
    pub github_repo_id: Option<String>,
    pub github_branch: String,
    pub root_directory: String,
    pub build_command: String,
    pub app_type: Framework,
    pub domain: Option<String>,
    pub github_installation_id: Option<String>,
    pub auto_deploy: bool,
    pub created_at: paas_core::UtcDateTime,
    pub updated_at: paas_core::UtcDateTime,
}

impl From<projects::Model> for ProjectResponse {
    fn from(p: projects::Model) -> Self {
        Self {
            id: p.id,
            name: p.name,
            github_url: p.repo_url,
            github_repo_id: p.repo_id,
            github_branch: p.default_branch,
            root_directory: p.root_directory,
            build_command: p.build_command,
            app_type: p.framework.into(),
            domain: p.domain,
            github_installation_id: p.installation_id,
            auto_deploy: p.auto_deploy,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequestBody {
    pub name: String,
    pub github_url: String,
    pub build_command: String,
    pub app_type: Framework,
    pub root_directory: Option<String>,
    pub domain: Option<String>,
    pub env_vars: Option<HashMap<String, String>>,
    pub github_repo_id: Option<String>,
    pub github_repo_full_name: Option<String>,
    pub github_branch: Option<String>,
    pub github_installation_id: Option<String>,
    pub auto_deploy: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequestBody {
    pub name: Option<String>,
    pub build_command: Option<String>,
    pub root_directory: Option<String>,
    pub auto_deploy: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub status: BuildStatus,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub created_at: paas_core::UtcDateTime,
    pub completed_at: Option<paas_core::UtcDateTime>,
    pub active_deployment_id: Option<Uuid>,
}

impl From<builds::Model> for BuildResponse {
    fn from(b: builds::Model) -> Self {
        Self {
            id: b.id,
            project_id: b.project_id,
            status: b.status.into(),
            commit_sha: b.commit_sha,
            commit_message: b.commit_message,
            created_at: b.created_at,
            completed_at: b.completed_at,
            active_deployment_id: None,
        }
    }
}

impl From<crate::services::builds::BuildWithActiveDeployment> for BuildResponse {
    fn from(joined: crate::services::builds::BuildWithActiveDeployment) -> Self {
        let mut response: BuildResponse = joined.build.into();
        response.active_deployment_id = joined.active_deployment.map(|d| d.id);
        response
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBuildRequestBody {
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub build_id: Uuid,
    pub status: DeploymentStatus,
    pub activated_at: paas_core::UtcDateTime,
}

impl From<deployments::Model> for DeploymentResponse {
    fn from(d: deployments::Model) -> Self {
        Self {
            id: d.id,
            project_id: d.project_id,
            build_id: d.build_id,
            status: d.status.into(),
            activated_at: d.activated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogEntryResponse {
    pub id: Uuid,
    pub build_id: Uuid,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: paas_core::UtcDateTime,
}

impl From<log_entries::Model> for LogEntryResponse {
    fn from(entry: log_entries::Model) -> Self {
        Self {
            id: entry.id,
            build_id: entry.build_id,
            level: entry.level.into(),
            message: entry.message,
            timestamp: entry.timestamp,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub key: String,
    pub created_at: paas_core::UtcDateTime,
    pub updated_at: paas_core::UtcDateTime,
}

impl From<environment_variables::Model> for EnvVarResponse {
    fn from(e: environment_variables::Model) -> Self {
        Self {
            id: e.id,
            project_id: e.project_id,
            key: e.key,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetEnvVarRequestBody {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DomainCheckResponse {
    pub available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstallationResponse {
    pub id: String,
    pub account_login: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryResponse {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub default_branch: String,
    pub private: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InternalLogRequestBody {
    pub logs: String,
    pub level: LogLevel,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InternalBuildStatusRequestBody {
    pub status: BuildStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponseBody {
    pub processed: u32,
    pub builds_triggered: u32,
    pub builds_skipped: u32,
}

impl From<crate::services::webhook::WebhookSummary> for WebhookResponseBody {
    fn from(summary: crate::services::webhook::WebhookSummary) -> Self {
        Self {
            processed: summary.processed,
            builds_triggered: summary.builds_triggered,
            builds_skipped: summary.builds_skipped,
        }
    }
}
