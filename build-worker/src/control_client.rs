//! Thin client for Control Plane's internal surface (spec.md §6 "Control
//! Plane internal"): the `PUT /builds/:id` status transition call.

use paas_core::types::BuildStatus;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ControlClientError {
    #[error("failed to reach control plane: {0}")]
    NetworkError(String),

    #[error("control plane rejected the status update: {0}")]
    Rejected(String),
}

#[derive(Serialize)]
struct SetStatusRequest {
    status: BuildStatus,
}

pub async fn set_build_status(
    client: &reqwest::Client,
    control_api_url: &str,
    build_id: Uuid,
    status: BuildStatus,
) -> Result<(), ControlClientError> {
    let url = format!("{}/builds/{}", control_api_url.trim_end_matches('/'), build_id);
    let response = client
        .put(&url)
        .json(&SetStatusRequest { status })
        .send()
        .await
        .map_err(|e| ControlClientError::NetworkError(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ControlClientError::Rejected(response.status().to_string()));
    }
    Ok(())
}
