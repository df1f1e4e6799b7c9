//! The per-job build procedure (spec.md §4.2 "Per-job procedure").

use std::collections::HashMap;
use std::path::PathBuf;

use paas_core::config::BuildWorkerConfig;
use paas_core::types::{BuildJobData, BuildStatus};
use paas_deployer::client::{Deployer, HttpDeployer};
use paas_deployer::{packaging, rewrite};
use paas_git::installation_token::InstallationTokenExchange;
use thiserror::Error;
use tracing::{error, info};

use crate::command::{run_with_timeout, CommandError};
use crate::control_client;
use crate::log_streamer::LogStreamer;
use crate::package_json::backend_needs_build;

#[derive(Error, Debug)]
enum JobError {
    #[error("failed to obtain installation token: {0}")]
    InstallationToken(String),

    #[error("git clone failed: {0}")]
    Clone(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("artifact packaging failed: {0}")]
    Packaging(String),

    #[error("artifact upload failed: {0}")]
    Upload(String),
}

fn workspace_dir(config: &BuildWorkerConfig, build_id: uuid::Uuid) -> PathBuf {
    config.workspace_root.join(build_id.to_string())
}

/// Runs the full per-job procedure described in spec.md §4.2. On any
/// failure the build is already marked `failed` and the workspace removed
/// before this function returns, matching step 8's "rethrow" wording
/// (translated here into an `Err` the caller logs rather than panics on).
pub async fn run_job(config: &BuildWorkerConfig, job: BuildJobData) -> bool {
    let http = reqwest::Client::new();
    let (streamer, ticker) = LogStreamer::spawn(&config.control_api_url, job.build_id);

    if let Err(err) = control_client::set_build_status(
        &http,
        &config.control_api_url,
        job.build_id,
        BuildStatus::Building,
    )
    .await
    {
        error!(build_id = %job.build_id, %err, "failed to mark build as building");
    }
    streamer.info("starting");

    let result = execute(config, &job, &streamer).await;

    let workspace = workspace_dir(config, job.build_id);
    let _ = tokio::fs::remove_dir_all(&workspace).await;

    let final_status = match &result {
        Ok(()) => {
            streamer.push(paas_core::LogLevel::Success, "build succeeded");
            BuildStatus::Success
        }
        Err(err) => {
            streamer.push(paas_core::LogLevel::Error, err.to_string());
            BuildStatus::Failed
        }
    };

    if let Err(err) =
        control_client::set_build_status(&http, &config.control_api_url, job.build_id, final_status)
            .await
    {
        error!(build_id = %job.build_id, %err, "failed to report final build status");
    }

    streamer.finish(ticker).await;

    match result {
        Ok(()) => {
            info!(build_id = %job.build_id, "build completed");
            true
        }
        Err(err) => {
            error!(build_id = %job.build_id, %err, "build failed");
            false
        }
    }
}

async fn execute(
    config: &BuildWorkerConfig,
    job: &BuildJobData,
    streamer: &LogStreamer,
) -> Result<(), JobError> {
    let workspace = workspace_dir(config, job.build_id);

    // Step 2: installation token, if the project references a private
    // repository through a GitHub App installation.
    let token = match &job.installation_id {
        Some(installation_id) => {
            let app_id = config.github_app_id.clone().unwrap_or_default();
            let key_path = config.github_app_private_key_path.clone().unwrap_or_default();
            let private_key = tokio::fs::read_to_string(&key_path)
                .await
                .map_err(|e| JobError::InstallationToken(e.to_string()))?;
            let exchange = InstallationTokenExchange::new(app_id, private_key);
            let now = chrono::Utc::now().timestamp();
            let token = exchange
                .exchange(installation_id, now)
                .await
                .map_err(|e| JobError::InstallationToken(e.to_string()))?;
            Some(token)
        }
        None => None,
    };

    // Step 3: clone.
    streamer.info("cloning repository");
    paas_git::clone_repository(&job.repo_url, &workspace, token.as_deref())
        .await
        .map_err(|e| JobError::Clone(e.to_string()))?;

    // Step 4.
    let project_dir = workspace.join(job.root_directory.trim_start_matches("./"));

    // Step 5: framework dispatch.
    let mut env: HashMap<String, String> = std::env::vars().collect();
    env.extend(job.env_vars.clone());

    if job.framework.is_frontend() {
        streamer.info("installing dependencies");
        run_command("bun install", &project_dir, &env, streamer).await?;

        let rewritten = rewrite::rewrite_package_manager(&job.build_command);
        streamer.info(format!("running: {rewritten}"));
        run_command(&rewritten, &project_dir, &env, streamer).await?;
    } else if backend_needs_build(&project_dir, &job.build_command) {
        streamer.info("installing dependencies");
        run_command("bun install", &project_dir, &env, streamer).await?;

        let rewritten = rewrite::rewrite_package_manager(&job.build_command);
        streamer.info(format!("running: {rewritten}"));
        run_command(&rewritten, &project_dir, &env, streamer).await?;
    } else {
        streamer.info("no compilation step required, shipping source as-is");
    }

    // Step 6: package and upload.
    streamer.info("packaging artifact");
    let tar_gz = packaging::package_artifact(&project_dir, job.framework, None)
        .map_err(|e| JobError::Packaging(e.to_string()))?;

    let deployer = HttpDeployer::new(config.deploy_engine_url.clone());
    deployer
        .upload_artifact(job.build_id, tar_gz)
        .await
        .map_err(|e| JobError::Upload(e.to_string()))?;
    streamer.info("artifact uploaded");

    Ok(())
}

async fn run_command(
    command: &str,
    cwd: &std::path::Path,
    env: &HashMap<String, String>,
    streamer: &LogStreamer,
) -> Result<(), CommandError> {
    run_with_timeout(command, cwd, env, move |line| streamer.info(line)).await
}
