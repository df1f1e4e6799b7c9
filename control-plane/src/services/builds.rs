//! Build creation (which enqueues), listing, log retrieval (spec.md §4.1
//! "Builds").

use std::time::Duration;

use paas_core::types::{BuildJobData, BuildStatus, Framework};
use paas_core::{ServiceError, ServiceResult};
use paas_entities::builds::{self, ActiveModel, Entity as Builds};
use paas_entities::deployments::{self, Entity as Deployments};
use paas_entities::log_entries::{self, Entity as LogEntries};
use paas_entities::projects::Entity as Projects;
use paas_queue::BuildQueue;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use super::env_vars::decrypted_env_map;

const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);
const DISPATCH_BACKOFFS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Dispatches a build job to the worker over its HTTP fallback path
/// (spec.md §5: "10 s per attempt with exponential backoff, 3 attempts,
/// 1s/2s/4s, for control-plane→worker build trigger when using the HTTP
/// fallback path").
async fn dispatch_to_worker(
    http_client: &reqwest::Client,
    dispatch_url: &str,
    job: &BuildJobData,
) -> Result<(), reqwest::Error> {
    let mut attempt = 0;
    loop {
        let result = http_client
            .post(dispatch_url)
            .json(job)
            .timeout(DISPATCH_TIMEOUT)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => return Ok(()),
            Err(err) => {
                if attempt >= DISPATCH_BACKOFFS.len() {
                    return Err(err);
                }
                tracing::warn!(attempt, %err, "build worker dispatch attempt failed, retrying");
                tokio::time::sleep(DISPATCH_BACKOFFS[attempt]).await;
                attempt += 1;
            }
        }
    }
}

/// A build listed alongside its project's currently active deployment, if
/// any (spec.md §4.1 "list-by-project with joined active-deployment
/// info").
pub struct BuildWithActiveDeployment {
    pub build: builds::Model,
    pub active_deployment: Option<deployments::Model>,
}

pub struct CreateBuildInput {
    pub project_id: Uuid,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
}

/// Creates a build record, translates it into a [`BuildJobData`], and
/// dispatches it to the build worker over HTTP (spec.md §4.1 "Queue
/// submission"). On dispatch failure, the build is immediately marked
/// `failed` with an explanatory log rather than left `pending`.
pub async fn create_build(
    db: &DatabaseConnection,
    encryption: &paas_core::encryption::EncryptionService,
    queue: &BuildQueue,
    http_client: &reqwest::Client,
    build_worker_url: &str,
    input: CreateBuildInput,
) -> ServiceResult<builds::Model> {
    let project = Projects::find_by_id(input.project_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found(format!("project {}", input.project_id)))?;

    let commit_message = input.commit_message.map(|mut m| {
        if let Some((byte_idx, _)) = m.char_indices().nth(255) {
            m.truncate(byte_idx);
        }
        m
    });

    let build = ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(input.project_id),
        status: Set(builds::BuildStatus::Pending),
        commit_sha: Set(input.commit_sha),
        commit_message: Set(commit_message),
        artifact_id: Set(None),
        created_at: sea_orm::ActiveValue::NotSet,
        completed_at: Set(None),
    }
    .insert(db)
    .await
    .map_err(|e| ServiceError::database(e.to_string()))?;

    let env_vars = decrypted_env_map(db, encryption, input.project_id).await?;
    let job = BuildJobData {
        build_id: build.id,
        project_id: input.project_id,
        repo_url: project.repo_url,
        build_command: project.build_command,
        root_directory: project.root_directory,
        framework: Framework::from(project.framework),
        env_vars,
        installation_id: project.installation_id,
    };

    let dispatch_url = format!("{}/build", build_worker_url.trim_end_matches('/'));
    if let Err(err) = dispatch_to_worker(http_client, &dispatch_url, &job).await {
        tracing::warn!(build_id = %build.id, %err, "failed to dispatch build job to worker");
        mark_build_terminal(db, queue, build.id, BuildStatus::Failed).await?;
        return Err(ServiceError::upstream("build-worker", err.to_string()));
    }

    Ok(build)
}

/// Applies a status transition, enforcing the DAG invariant (spec.md §3,
/// §8 invariant 3: "a build never transitions out of a terminal state").
/// Terminal transitions stamp `completed_at` and clear the build from the
/// queue's in-flight set.
pub async fn mark_build_terminal(
    db: &DatabaseConnection,
    queue: &BuildQueue,
    build_id: Uuid,
    status: BuildStatus,
) -> ServiceResult<builds::Model> {
    set_build_status(db, queue, build_id, status).await
}

pub async fn set_build_status(
    db: &DatabaseConnection,
    queue: &BuildQueue,
    build_id: Uuid,
    status: BuildStatus,
) -> ServiceResult<builds::Model> {
    let existing = Builds::find_by_id(build_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found(format!("build {build_id}")))?;

    let current: BuildStatus = existing.status.into();
    if current.is_terminal() {
        // Last-write-wins is allowed between two terminal writes (spec.md
        // §5 "Ordering guarantees"), but never backtracking out of
        // terminal is an invariant, so a non-terminal target is rejected.
        if !status.is_terminal() {
            return Err(ServiceError::validation(format!(
                "build {build_id} is already terminal ({current}); cannot move to {status}"
            )));
        }
    } else if !current.can_transition_to(status) {
        return Err(ServiceError::validation(format!(
            "build {build_id} cannot transition from {current} to {status}"
        )));
    }

    let mut active: ActiveModel = existing.into();
    active.status = Set(status.into());
    if status.is_terminal() {
        active.completed_at = Set(Some(chrono::Utc::now()));
    }

    let updated = active
        .update(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    if status.is_terminal() {
        queue.mark_terminal(build_id, status == BuildStatus::Success);
    }

    Ok(updated)
}

pub async fn get_build(db: &DatabaseConnection, id: Uuid) -> ServiceResult<builds::Model> {
    Builds::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found(format!("build {id}")))
}

pub async fn list_builds_for_project(
    db: &DatabaseConnection,
    project_id: Uuid,
) -> ServiceResult<Vec<BuildWithActiveDeployment>> {
    let builds = Builds::find()
        .filter(builds::Column::ProjectId.eq(project_id))
        .order_by_desc(builds::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    let active_deployment = Deployments::find()
        .filter(deployments::Column::ProjectId.eq(project_id))
        .filter(deployments::Column::Status.eq(deployments::DeploymentStatus::Active))
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    Ok(builds
        .into_iter()
        .map(|build| {
            let active_deployment = active_deployment
                .as_ref()
                .filter(|d| d.build_id == build.id)
                .cloned();
            BuildWithActiveDeployment {
                build,
                active_deployment,
            }
        })
        .collect())
}

pub async fn get_build_logs(
    db: &DatabaseConnection,
    build_id: Uuid,
) -> ServiceResult<Vec<log_entries::Model>> {
    LogEntries::find()
        .filter(log_entries::Column::BuildId.eq(build_id))
        .order_by_asc(log_entries::Column::Timestamp)
        .all(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))
}

pub async fn delete_build_logs(db: &DatabaseConnection, build_id: Uuid) -> ServiceResult<()> {
    LogEntries::delete_many()
        .filter(log_entries::Column::BuildId.eq(build_id))
        .exec(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;
    Ok(())
}

/// `(project_id, commit_sha)` idempotency check for webhook ingestion
/// (spec.md §4.4).
pub async fn build_exists_for_commit(
    db: &DatabaseConnection,
    project_id: Uuid,
    commit_sha: &str,
) -> ServiceResult<bool> {
    let existing = Builds::find()
        .filter(builds::Column::ProjectId.eq(project_id))
        .filter(builds::Column::CommitSha.eq(commit_sha))
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;
    Ok(existing.is_some())
}
