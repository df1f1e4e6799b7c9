//! Container-mode activation (spec.md §4.3 "Container mode"). Grounded in
//! `temps-deployer::docker::DockerRuntime`'s bollard usage, trimmed down
//! to this agent's narrower needs: one image build, one container run,
//! one log follower, keep-3 image pruning.

use std::collections::HashMap;
use std::path::Path;

use bollard::query_parameters::{
    BuildImageOptions, ListContainersOptions, ListImagesOptions, LogsOptions,
    RemoveContainerOptions, RemoveImageOptions, StopContainerOptions,
};
use bollard::Docker;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::Full;
use paas_core::types::Framework;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dockerfile;
use crate::log_streamer::DeployLogStreamer;

const LABEL_PROJECT_ID: &str = "thakur.projectId";
const LABEL_BUILD_ID: &str = "thakur.buildId";
const IMAGES_KEPT: usize = 3;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("docker error: {0}")]
    Docker(String),

    #[error("failed to build image: {0}")]
    BuildFailed(String),
}

pub fn container_name(project_id: Uuid) -> String {
    format!("thakur-{}", &project_id.to_string()[..8])
}

pub fn image_name(project_id: Uuid, build_id: Uuid) -> String {
    format!(
        "thakur-deploy/{}:{}",
        &project_id.to_string()[..8],
        &build_id.to_string()[..8]
    )
}

async fn tar_context(context_path: &Path) -> Result<Full<Bytes>, ContainerError> {
    let context_path = context_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut buffer = Vec::new();
        let mut builder = tar::Builder::new(&mut buffer);
        builder
            .append_dir_all(".", &context_path)
            .map_err(|e| ContainerError::Docker(e.to_string()))?;
        builder.finish().map_err(|e| ContainerError::Docker(e.to_string()))?;
        Ok(Full::new(Bytes::from(buffer)))
    })
    .await
    .map_err(|e| ContainerError::Docker(e.to_string()))?
}

/// Stops and removes any existing container for `project_id`, ignoring
/// "not found" — there may be nothing running yet.
pub async fn stop_existing(docker: &Docker, project_id: Uuid) {
    let name = container_name(project_id);

    if docker
        .stop_container(&name, None::<StopContainerOptions>)
        .await
        .is_err()
    {
        return;
    }

    if let Err(err) = docker
        .remove_container(
            &name,
            Some(RemoveContainerOptions {
                force: true,
                ..Default::default()
            }),
        )
        .await
    {
        warn!(%err, container = %name, "failed to remove prior container");
    }
}

/// Ensures a Dockerfile exists in `extract_dir` (sanitizing one provided
/// by the project, or generating one per framework), then builds the
/// image (spec.md §4.3 "Container mode").
pub async fn build_image(
    docker: &Docker,
    extract_dir: &Path,
    framework: Framework,
    project_id: Uuid,
    build_id: Uuid,
    port: u16,
) -> Result<String, ContainerError> {
    let dockerfile_path = dockerfile::dockerfile_path(extract_dir);
    let contents = match tokio::fs::read_to_string(&dockerfile_path).await {
        Ok(existing) => dockerfile::sanitize(&existing, port),
        Err(_) => {
            let internal = dockerfile::internal_port(framework);
            dockerfile::generate(framework, &format!("PORT={internal}"))
        }
    };
    tokio::fs::write(&dockerfile_path, contents)
        .await
        .map_err(|e| ContainerError::Docker(e.to_string()))?;

    let image = image_name(project_id, build_id);
    let tar_body = tar_context(extract_dir).await?;

    let build_options = BuildImageOptions {
        dockerfile: "Dockerfile".to_string(),
        t: Some(image.clone()),
        ..Default::default()
    };

    let mut stream = docker.build_image(build_options, None, Some(tar_body));
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(info) => {
                if let Some(error) = info.error {
                    return Err(ContainerError::BuildFailed(error));
                }
            }
            Err(err) => return Err(ContainerError::BuildFailed(err.to_string())),
        }
    }

    Ok(image)
}

/// Runs the built image detached (spec.md §4.3: `--restart unless-stopped`,
/// 512m memory, 0.5 cpus, `<port>:<internal>` mapping, labels for
/// discovery and pruning).
pub async fn run_container(
    docker: &Docker,
    project_id: Uuid,
    build_id: Uuid,
    image: &str,
    host_port: u16,
    internal_port: u16,
    env_vars: &HashMap<String, String>,
) -> Result<String, ContainerError> {
    let container_port_key = format!("{internal_port}/tcp");
    let port_bindings = HashMap::from([(
        container_port_key.clone(),
        Some(vec![bollard::models::PortBinding {
            host_ip: Some("0.0.0.0".to_string()),
            host_port: Some(host_port.to_string()),
        }]),
    )]);
    let exposed_ports = HashMap::from([(container_port_key, HashMap::new())]);

    let host_config = bollard::models::HostConfig {
        port_bindings: Some(port_bindings),
        restart_policy: Some(bollard::models::RestartPolicy {
            name: Some(bollard::models::RestartPolicyNameEnum::UNLESS_STOPPED),
            ..Default::default()
        }),
        memory: Some(512 * 1024 * 1024),
        nano_cpus: Some(500_000_000),
        ..Default::default()
    };

    let mut env: Vec<String> = env_vars.iter().map(|(k, v)| format!("{k}={v}")).collect();
    env.push(format!("PORT={internal_port}"));
    env.push("NODE_ENV=production".to_string());

    let labels = HashMap::from([
        (LABEL_PROJECT_ID.to_string(), project_id.to_string()),
        (LABEL_BUILD_ID.to_string(), build_id.to_string()),
    ]);

    let config = bollard::models::ContainerCreateBody {
        image: Some(image.to_string()),
        env: Some(env),
        exposed_ports: Some(exposed_ports),
        host_config: Some(host_config),
        labels: Some(labels),
        ..Default::default()
    };

    let name = container_name(project_id);
    let created = docker
        .create_container(
            Some(bollard::query_parameters::CreateContainerOptionsBuilder::new().name(&name).build()),
            config,
        )
        .await
        .map_err(|e| ContainerError::Docker(e.to_string()))?;

    docker
        .start_container(&created.id, None::<bollard::query_parameters::StartContainerOptions>)
        .await
        .map_err(|e| ContainerError::Docker(e.to_string()))?;

    Ok(created.id)
}

/// Spawns a background task tailing the container's combined stdout/
/// stderr into the deploy log pipeline. Returns a handle the caller can
/// abort to cancel following (spec.md §4.3: "register it in a
/// `project_id → cancel` map").
pub fn follow_logs(docker: Docker, container_id: String, streamer: DeployLogStreamer) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = docker.logs(
            &container_id,
            Some(LogsOptions {
                stdout: true,
                stderr: true,
                follow: true,
                ..Default::default()
            }),
        );

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(log_output) => {
                    let text = String::from_utf8_lossy(&log_output.into_bytes()).to_string();
                    for line in text.lines() {
                        streamer.push(line.to_string());
                    }
                }
                Err(err) => {
                    error!(%err, "container log stream error");
                    break;
                }
            }
        }
    })
}

async fn prune_keeping(docker: &Docker, project_id: Uuid, keep: usize) {
    let prefix = format!("thakur-deploy/{}", &project_id.to_string()[..8]);
    let images = match docker
        .list_images(Some(ListImagesOptions {
            all: true,
            ..Default::default()
        }))
        .await
    {
        Ok(images) => images,
        Err(err) => {
            warn!(%err, "failed to list images for pruning");
            return;
        }
    };

    let mut matching: Vec<_> = images
        .into_iter()
        .filter(|image| image.repo_tags.iter().any(|tag| tag.starts_with(&prefix)))
        .collect();
    matching.sort_by_key(|image| std::cmp::Reverse(image.created));

    for stale in matching.into_iter().skip(keep) {
        if let Err(err) = docker
            .remove_image(&stale.id, None::<RemoveImageOptions>, None)
            .await
        {
            warn!(%err, image = %stale.id, "failed to prune image");
        }
    }
}

/// Removes images for `project_id` beyond the `IMAGES_KEPT` newest by
/// creation time (spec.md §4.3: "prune images for the project, keeping
/// the 3 newest").
pub async fn prune_images(docker: &Docker, project_id: Uuid) {
    prune_keeping(docker, project_id, IMAGES_KEPT).await
}

/// Removes every image for `project_id` (spec.md §4.3 "Delete": "remove
/// all images for this project").
pub async fn prune_all_images(docker: &Docker, project_id: Uuid) {
    prune_keeping(docker, project_id, 0).await
}

/// Recovery on startup (spec.md §4.3): "Enumerate containers carrying the
/// `thakur.projectId` label and re-attach log followers for each."
pub async fn recover_running_containers(
    docker: &Docker,
    control_api_url: &str,
) -> Vec<(Uuid, tokio::task::JoinHandle<()>)> {
    let filters = HashMap::from([("label".to_string(), vec![LABEL_PROJECT_ID.to_string()])]);
    let containers = match docker
        .list_containers(Some(ListContainersOptions {
            all: false,
            filters: Some(filters),
            ..Default::default()
        }))
        .await
    {
        Ok(containers) => containers,
        Err(err) => {
            error!(%err, "failed to enumerate containers for log-follower recovery");
            return Vec::new();
        }
    };

    let mut handles = Vec::new();
    for container in containers {
        let Some(id) = container.id else { continue };
        let Some(labels) = container.labels else { continue };
        let Some(project_id) = labels.get(LABEL_PROJECT_ID).and_then(|v| Uuid::parse_str(v).ok()) else {
            continue;
        };
        let build_id = labels
            .get(LABEL_BUILD_ID)
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or_else(Uuid::nil);

        info!(%project_id, container = %id, "re-attaching log follower");
        let streamer = DeployLogStreamer::spawn(control_api_url, build_id);
        handles.push((project_id, follow_logs(docker.clone(), id, streamer)));
    }
    handles
}
