//! Stop and delete operations (spec.md §4.3 "Stop"/"Delete").

use uuid::Uuid;

use crate::container;
use crate::paths::ProjectPaths;
use crate::proc_lifecycle::stop_prior_process;
use crate::state::AppState;

/// Kills the project's process or container. Proxy configuration is left
/// in place — only `delete_project` removes it.
pub async fn stop_project(state: &AppState, project_id: Uuid, port: u16) {
    let _guard = state.project_locks.lock(project_id).await;

    if let Some(docker) = &state.docker {
        container::stop_existing(docker, project_id).await;
        return;
    }

    if !state.static_servers.stop(project_id) {
        let paths = ProjectPaths::new(&state.config.apps_dir, project_id);
        stop_prior_process(&paths, port).await;
    }
}

async fn remove_proxy_config(state: &AppState, subdomain: &str) {
    let config_path = state.config.nginx_sites_dir.join(format!("{subdomain}.conf"));
    let _ = tokio::fs::remove_file(config_path).await;
    let enabled_path = state
        .config
        .nginx_sites_dir
        .join("../sites-enabled")
        .join(format!("{subdomain}.conf"));
    let _ = tokio::fs::remove_file(enabled_path).await;
}

/// Stops the project, removes its filesystem tree, deletes its artifacts,
/// removes its proxy configuration, and (container mode) removes its
/// images.
pub async fn delete_project(
    state: &AppState,
    project_id: Uuid,
    port: Option<u16>,
    subdomain: Option<&str>,
    build_ids: &[Uuid],
) {
    if let Some(port) = port {
        stop_project(state, project_id, port).await;
    }

    let _guard = state.project_locks.lock(project_id).await;

    let paths = ProjectPaths::new(&state.config.apps_dir, project_id);
    let _ = tokio::fs::remove_dir_all(paths.root()).await;

    for build_id in build_ids {
        let artifact = paas_deployer::packaging::artifact_path(&state.config.artifacts_dir, *build_id);
        let _ = tokio::fs::remove_file(artifact).await;
    }

    if let Some(subdomain) = subdomain {
        remove_proxy_config(state, subdomain).await;
    }

    if let Some(docker) = &state.docker {
        container::prune_all_images(docker, project_id).await;
    }
}
