//! Activation orchestration (spec.md §4.3 steps 1–9), dispatching to
//! either process mode or container mode for steps 4–8.

use std::time::Duration;

use paas_core::types::Framework;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::container;
use crate::dockerfile;
use crate::health_check::wait_until_healthy;
use crate::log_streamer::DeployLogStreamer;
use crate::nginx;
use crate::paths::ProjectPaths;
use crate::proc_lifecycle::stop_prior_process;
use crate::runtime;
use crate::state::AppState;

const HEALTH_CHECK_DEADLINE: Duration = Duration::from_secs(15);
const CONTAINER_HEALTH_CHECK_DEADLINE: Duration = Duration::from_secs(30);
const EXTRACT_RETRIES: u32 = 3;
const EXTRACT_BACKOFF: Duration = Duration::from_millis(300);

#[derive(Error, Debug)]
pub enum ActivationError {
    #[error("artifact not found for build {build_id}")]
    ArtifactMissing { build_id: Uuid },

    #[error("failed to extract artifact: {0}")]
    ExtractFailed(String),

    #[error("failed to rotate the current symlink: {0}")]
    RotationFailed(String),

    #[error(transparent)]
    Runtime(#[from] runtime::RuntimeError),

    #[error("container activation failed: {0}")]
    Container(#[from] container::ContainerError),
}

pub struct ActivationOutcome {
    pub healthy: bool,
    pub proxy_configured: bool,
}

pub struct ActivationRequest {
    pub project_id: Uuid,
    pub build_id: Uuid,
    pub port: u16,
    pub framework: Framework,
    pub subdomain: Option<String>,
    pub env_vars: std::collections::HashMap<String, String>,
}

pub async fn activate(
    state: &AppState,
    request: ActivationRequest,
) -> Result<ActivationOutcome, ActivationError> {
    let _guard = state.project_locks.lock(request.project_id).await;

    // Step 1: verify the artifact exists.
    let artifact = paas_deployer::packaging::artifact_path(&state.config.artifacts_dir, request.build_id);
    let tar_gz = tokio::fs::read(&artifact).await.map_err(|_| ActivationError::ArtifactMissing {
        build_id: request.build_id,
    })?;

    // Step 2: extract.
    let paths = ProjectPaths::new(&state.config.apps_dir, request.project_id);
    tokio::fs::create_dir_all(paths.root())
        .await
        .map_err(|e| ActivationError::ExtractFailed(e.to_string()))?;
    let extract_dir = paths.extracted_dir(request.build_id);
    extract_with_retries(&tar_gz, &extract_dir).await?;

    // Step 3: atomic symlink rotation.
    crate::symlink::rotate_current(&paths, &extract_dir)
        .await
        .map_err(|e| ActivationError::RotationFailed(e.to_string()))?;
    let _ = tokio::fs::write(paths.current_build_id_file(), request.build_id.to_string()).await;

    let healthy = if let Some(docker) = &state.docker {
        activate_container(docker, &state.config.control_api_url, &request, &extract_dir).await?
    } else {
        activate_process(state, &paths, &request, &extract_dir).await?
    };

    let proxy_configured = match (&request.subdomain, &state.config.base_domain) {
        (Some(subdomain), Some(base_domain)) => {
            let enabled_sites_dir = state.config.nginx_sites_dir.join("../sites-enabled");
            nginx::configure_proxy(
                &state.config.nginx_sites_dir,
                &enabled_sites_dir,
                subdomain,
                base_domain,
                request.port,
            )
            .await
        }
        _ => false,
    };

    Ok(ActivationOutcome {
        healthy,
        proxy_configured,
    })
}

/// Extraction retry wrapper (spec.md §5: "Deploy extract retries: 3 with
/// 300 ms backoff within 8 s total"). Runs the blocking tar extraction on
/// a blocking-pool thread so a slow disk doesn't stall the executor.
async fn extract_with_retries(
    tar_gz: &[u8],
    destination: &std::path::Path,
) -> Result<(), ActivationError> {
    let mut last_error = None;
    for attempt in 1..=EXTRACT_RETRIES {
        let tar_gz = tar_gz.to_vec();
        let destination = destination.to_path_buf();
        let result = tokio::task::spawn_blocking(move || {
            paas_deployer::packaging::extract_artifact(&tar_gz, &destination)
        })
        .await
        .map_err(|e| ActivationError::ExtractFailed(e.to_string()))?;

        match result {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(attempt, %err, "artifact extraction failed");
                last_error = Some(err.to_string());
                if attempt < EXTRACT_RETRIES {
                    tokio::time::sleep(EXTRACT_BACKOFF).await;
                }
            }
        }
    }
    Err(ActivationError::ExtractFailed(
        last_error.unwrap_or_else(|| "extraction failed".to_string()),
    ))
}

async fn activate_process(
    state: &AppState,
    paths: &ProjectPaths,
    request: &ActivationRequest,
    extract_dir: &std::path::Path,
) -> Result<bool, ActivationError> {
    state.static_servers.stop(request.project_id);
    stop_prior_process(paths, request.port).await;

    runtime::launch(
        paths,
        request.framework,
        extract_dir,
        request.port,
        &request.env_vars,
        request.build_id,
        &state.config.control_api_url,
        &state.static_servers,
    )
    .await?;

    Ok(wait_until_healthy(request.port, HEALTH_CHECK_DEADLINE).await)
}

async fn activate_container(
    docker: &bollard::Docker,
    control_api_url: &str,
    request: &ActivationRequest,
    extract_dir: &std::path::Path,
) -> Result<bool, ActivationError> {
    container::stop_existing(docker, request.project_id).await;

    let image = container::build_image(
        docker,
        extract_dir,
        request.framework,
        request.project_id,
        request.build_id,
        request.port,
    )
    .await?;

    let internal_port = dockerfile::internal_port(request.framework);
    let container_id = container::run_container(
        docker,
        request.project_id,
        request.build_id,
        &image,
        request.port,
        internal_port,
        &request.env_vars,
    )
    .await?;

    let healthy = wait_until_healthy(request.port, CONTAINER_HEALTH_CHECK_DEADLINE).await;

    if healthy {
        let streamer = DeployLogStreamer::spawn(control_api_url, request.build_id);
        container::follow_logs(docker.clone(), container_id, streamer);
        container::prune_images(docker, request.project_id).await;
    } else {
        warn!(project_id = %request.project_id, "container failed its health check");
    }

    Ok(healthy)
}
