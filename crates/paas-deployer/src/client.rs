use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::wire::{ActivateRequest, ActivateResponse, DeleteProjectRequest, PortCheckResponse, StopRequest};

#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("deploy engine unreachable: {0}")]
    NetworkError(String),

    #[error("deploy engine returned an error response: {0}")]
    DeploymentFailed(String),

    #[error("artifact not found for build {build_id}")]
    ArtifactMissing { build_id: Uuid },

    #[error("port {port} is not free")]
    PortOccupied { port: u16 },

    #[error("other error: {0}")]
    Other(String),
}

/// Control Plane's view of the Deploy Engine (spec.md §9 design note on
/// interface boundaries — "singleton services become explicit
/// constructor-injected dependencies"). Held as `Arc<dyn Deployer>` so
/// tests can substitute a stub without a running Deploy Engine process.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn check_port(&self, port: u16) -> Result<bool, DeployerError>;

    async fn upload_artifact(&self, build_id: Uuid, tar_gz: Vec<u8>) -> Result<(), DeployerError>;

    async fn activate(&self, request: ActivateRequest) -> Result<ActivateResponse, DeployerError>;

    async fn stop(&self, request: StopRequest) -> Result<(), DeployerError>;

    async fn delete_project(&self, request: DeleteProjectRequest) -> Result<(), DeployerError>;
}

/// HTTP-backed implementation of [`Deployer`] talking to the Deploy Engine
/// binary over its REST surface (spec.md §6).
pub struct HttpDeployer {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDeployer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Deployer for HttpDeployer {
    async fn check_port(&self, port: u16) -> Result<bool, DeployerError> {
        let response = self
            .client
            .post(self.url("/ports/check"))
            .json(&serde_json::json!({ "port": port }))
            .send()
            .await
            .map_err(|e| DeployerError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeployerError::DeploymentFailed(format!(
                "ports/check returned {}",
                response.status()
            )));
        }

        let body: PortCheckResponse = response
            .json()
            .await
            .map_err(|e| DeployerError::Other(e.to_string()))?;
        Ok(body.available)
    }

    async fn upload_artifact(&self, build_id: Uuid, tar_gz: Vec<u8>) -> Result<(), DeployerError> {
        let response = self
            .client
            .post(self.url(&format!("/artifacts/upload?buildId={build_id}")))
            .body(tar_gz)
            .send()
            .await
            .map_err(|e| DeployerError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeployerError::DeploymentFailed(format!(
                "artifact upload for build {build_id} returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn activate(&self, request: ActivateRequest) -> Result<ActivateResponse, DeployerError> {
        let response = self
            .client
            .post(self.url("/activate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| DeployerError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeployerError::DeploymentFailed(format!(
                "activate for build {} returned {}",
                request.build_id,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DeployerError::Other(e.to_string()))
    }

    async fn stop(&self, request: StopRequest) -> Result<(), DeployerError> {
        let response = self
            .client
            .post(self.url("/stop"))
            .json(&request)
            .send()
            .await
            .map_err(|e| DeployerError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeployerError::DeploymentFailed(format!(
                "stop returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_project(&self, request: DeleteProjectRequest) -> Result<(), DeployerError> {
        // Best-effort per spec.md §4.1 "Project deletion sequence" step 2:
        // the caller proceeds with the database cascade regardless of the
        // outcome here, so failures are logged by the caller, not retried.
        let response = self
            .client
            .post(self.url(&format!("/projects/{}/delete", request.project_id)))
            .json(&request)
            .send()
            .await
            .map_err(|e| DeployerError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeployerError::DeploymentFailed(format!(
                "project delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
