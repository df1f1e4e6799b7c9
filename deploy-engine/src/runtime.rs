//! Runtime preparation and launch (spec.md §4.3 steps 5–7): decide
//! between the static-server path and a spawned process, then launch it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use paas_core::types::Framework;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::process::Command;
use tracing::{error, warn};
use uuid::Uuid;

use crate::backend_entry::start_command;
use crate::log_streamer::DeployLogStreamer;
use crate::paths::ProjectPaths;
use crate::static_registry::StaticServerRegistry;
use crate::static_server::{router, StaticServerState};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("failed to spawn application process: {0}")]
    SpawnFailed(String),

    #[error("failed to bind static server port: {0}")]
    BindFailed(String),

    #[error("failed to write server.pid: {0}")]
    PidWriteFailed(String),

    #[error("dependency install failed: {0}")]
    InstallFailed(String),
}

/// Build Worker's artifact excludes `node_modules` (spec.md §6 packaging
/// deny-list), so the process-launch path reinstalls dependencies before
/// starting the application.
async fn install_dependencies(project_dir: &Path) -> Result<(), RuntimeError> {
    let status = Command::new("bun")
        .arg("install")
        .current_dir(project_dir)
        .status()
        .await
        .map_err(|e| RuntimeError::InstallFailed(e.to_string()))?;

    if !status.success() {
        return Err(RuntimeError::InstallFailed(format!(
            "bun install exited with {status}"
        )));
    }
    Ok(())
}

/// Resolves the directory to serve statically, if this deployment should
/// take the static-server path rather than launching a process (spec.md
/// §4.3 step 5: "If `framework == vite`, or `framework == nextjs` and
/// `out/` exists in the extract").
fn static_root(framework: Framework, extract_dir: &Path) -> Option<PathBuf> {
    match framework {
        Framework::Vite => Some(extract_dir.join("dist")),
        Framework::Nextjs => {
            let out = extract_dir.join("out");
            out.is_dir().then_some(out)
        }
        Framework::Express | Framework::Hono | Framework::Elysia => None,
    }
}

/// Launches the deployment for `extract_dir`, either as an in-process
/// static server or as a spawned application process, writing
/// `server.pid` in the latter case.
pub async fn launch(
    paths: &ProjectPaths,
    framework: Framework,
    extract_dir: &Path,
    port: u16,
    env_vars: &HashMap<String, String>,
    build_id: Uuid,
    control_api_url: &str,
    static_registry: &StaticServerRegistry,
) -> Result<(), RuntimeError> {
    if let Some(root) = static_root(framework, extract_dir) {
        launch_static(root, port, static_registry, paths.root().to_path_buf())
            .await
    } else {
        launch_process(
            paths,
            framework,
            extract_dir,
            port,
            env_vars,
            build_id,
            control_api_url,
        )
        .await
    }
}

async fn launch_static(
    root: PathBuf,
    port: u16,
    registry: &StaticServerRegistry,
    project_root: PathBuf,
) -> Result<(), RuntimeError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| RuntimeError::BindFailed(e.to_string()))?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let app = router(StaticServerState::new(root));

    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(err) = result {
            error!(%err, "static server exited with an error");
        }
    });

    // Mirrors `server.pid` bookkeeping: record that a static server, not a
    // spawned process, currently owns this project's port.
    let _ = tokio::fs::write(project_root.join("server.pid"), "static").await;

    registry.register(derive_project_id(&project_root), shutdown_tx);
    Ok(())
}

fn derive_project_id(project_root: &Path) -> Uuid {
    project_root
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| Uuid::parse_str(name).ok())
        .unwrap_or_else(Uuid::nil)
}

async fn launch_process(
    paths: &ProjectPaths,
    framework: Framework,
    extract_dir: &Path,
    port: u16,
    env_vars: &HashMap<String, String>,
    build_id: Uuid,
    control_api_url: &str,
) -> Result<(), RuntimeError> {
    let command = match framework {
        Framework::Nextjs => format!("bun run start -- --port {port}"),
        Framework::Express | Framework::Hono | Framework::Elysia => start_command(extract_dir),
        Framework::Vite => unreachable!("vite always takes the static path"),
    };

    install_dependencies(extract_dir).await?;

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .current_dir(extract_dir)
        .envs(env_vars)
        .env("NODE_ENV", "production")
        .env("PORT", port.to_string())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RuntimeError::SpawnFailed(e.to_string()))?;

    let pid = child.id().unwrap_or_default();
    tokio::fs::write(paths.server_pid_file(), pid.to_string())
        .await
        .map_err(|e| RuntimeError::PidWriteFailed(e.to_string()))?;

    let streamer = DeployLogStreamer::spawn(control_api_url, build_id);
    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    // Outlives this function: the spawned application keeps running after
    // activation returns, so its log-forwarding task runs until the
    // process exits or is stopped.
    tokio::spawn(async move {
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        loop {
            tokio::select! {
                line = stdout_lines.next_line() => match line {
                    Ok(Some(line)) => streamer.push(line),
                    Ok(None) => break,
                    Err(_) => break,
                },
                line = stderr_lines.next_line() => match line {
                    Ok(Some(line)) => streamer.push(line),
                    Ok(None) => continue,
                    Err(_) => continue,
                },
            }
        }
        if let Err(err) = child.wait().await {
            warn!(%err, "error waiting on deployed process");
        }
    });

    Ok(())
}
