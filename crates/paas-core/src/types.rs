//! Closed wire/domain types shared by every service: the framework enum,
//! the build/deployment/log-level enums, and the `BuildJobData` record
//! (spec.md §9 design note: "specify a closed record ... unknown fields
//! are rejected" — `serde(deny_unknown_fields)` gives us that for free).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    Nextjs,
    Vite,
    Express,
    Hono,
    Elysia,
}

impl Framework {
    pub fn is_frontend(self) -> bool {
        matches!(self, Framework::Nextjs | Framework::Vite)
    }

    pub fn is_backend(self) -> bool {
        !self.is_frontend()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Framework::Nextjs => "nextjs",
            Framework::Vite => "vite",
            Framework::Express => "express",
            Framework::Hono => "hono",
            Framework::Elysia => "elysia",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nextjs" => Ok(Framework::Nextjs),
            "vite" => Ok(Framework::Vite),
            "express" => Ok(Framework::Express),
            "hono" => Ok(Framework::Hono),
            "elysia" => Ok(Framework::Elysia),
            other => Err(format!("unknown framework: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Pending,
    Building,
    Success,
    Failed,
}

impl BuildStatus {
    /// Builds never transition out of a terminal state (Invariant 3).
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Failed)
    }

    /// Validates a single edge of the `pending -> building -> {success,
    /// failed}` DAG described in spec.md §3.
    pub fn can_transition_to(self, next: BuildStatus) -> bool {
        use BuildStatus::*;
        matches!(
            (self, next),
            (Pending, Building) | (Building, Success) | (Building, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Pending => "pending",
            BuildStatus::Building => "building",
            BuildStatus::Success => "success",
            BuildStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Active,
    Inactive,
}

impl DeploymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentStatus::Active => "active",
            DeploymentStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
    Deploy,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
            LogLevel::Deploy => "deploy",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "success" => Ok(LogLevel::Success),
            "deploy" => Ok(LogLevel::Deploy),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// The job payload enqueued by Control Plane and consumed by Build Worker
/// (spec.md §4.1 "Queue submission", §9 design note). Unknown fields are
/// rejected rather than silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct BuildJobData {
    pub build_id: Uuid,
    pub project_id: Uuid,
    pub repo_url: String,
    pub build_command: String,
    pub root_directory: String,
    pub framework: Framework,
    pub env_vars: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_status_dag_rejects_non_adjacent_edges() {
        assert!(BuildStatus::Pending.can_transition_to(BuildStatus::Building));
        assert!(BuildStatus::Building.can_transition_to(BuildStatus::Success));
        assert!(BuildStatus::Building.can_transition_to(BuildStatus::Failed));
        assert!(!BuildStatus::Pending.can_transition_to(BuildStatus::Success));
        assert!(!BuildStatus::Success.can_transition_to(BuildStatus::Failed));
        assert!(!BuildStatus::Failed.can_transition_to(BuildStatus::Building));
    }

    #[test]
    fn terminal_states_are_success_and_failed_only() {
        assert!(!BuildStatus::Pending.is_terminal());
        assert!(!BuildStatus::Building.is_terminal());
        assert!(BuildStatus::Success.is_terminal());
        assert!(BuildStatus::Failed.is_terminal());
    }

    #[test]
    fn job_data_rejects_unknown_fields() {
        let raw = serde_json::json!({
            "buildId": Uuid::nil(),
            "projectId": Uuid::nil(),
            "repoUrl": "https://example.com/repo.git",
            "buildCommand": "npm run build",
            "rootDirectory": "./",
            "framework": "vite",
            "envVars": {},
            "unexpectedField": "nope",
        });
        let result: Result<BuildJobData, _> = serde_json::from_value(raw);
        assert!(result.is_err());
    }
}
