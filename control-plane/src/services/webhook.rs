//! Webhook ingress (spec.md §4.4): signature verification, push-event
//! project matching, and idempotent build creation.

use paas_core::encryption::EncryptionService;
use paas_deployer::Deployer;
use paas_entities::projects::{self, Entity as Projects};
use paas_entities::source_installations::{self, Entity as SourceInstallations};
use paas_git::webhook_event::{InstallationEvent, PushEvent, WebhookEvent};
use paas_queue::BuildQueue;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::builds::{build_exists_for_commit, create_build, CreateBuildInput};

#[derive(Debug, Serialize, Default)]
pub struct WebhookSummary {
    pub processed: u32,
    pub builds_triggered: u32,
    pub builds_skipped: u32,
}

/// Handles a parsed webhook event. Never propagates an error to the
/// caller (spec.md §4.4 "never throw to the client") — failures are
/// logged and folded into the summary counts instead.
pub async fn handle_webhook_event(
    db: &DatabaseConnection,
    encryption: &EncryptionService,
    queue: &BuildQueue,
    http_client: &reqwest::Client,
    build_worker_url: &str,
    event: WebhookEvent,
) -> WebhookSummary {
    match event {
        WebhookEvent::Push(push) => {
            handle_push(db, encryption, queue, http_client, build_worker_url, push).await
        }
        WebhookEvent::Installation(installation) => handle_installation(db, installation).await,
        WebhookEvent::Other(event_type) => {
            info!(%event_type, "ignoring unhandled webhook event type");
            WebhookSummary {
                processed: 1,
                ..Default::default()
            }
        }
    }
}

async fn handle_push(
    db: &DatabaseConnection,
    encryption: &EncryptionService,
    queue: &BuildQueue,
    http_client: &reqwest::Client,
    build_worker_url: &str,
    push: PushEvent,
) -> WebhookSummary {
    let matching = match Projects::find()
        .filter(projects::Column::RepoId.eq(push.repo_id.clone()))
        .filter(projects::Column::DefaultBranch.eq(push.branch.clone()))
        .all(db)
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            warn!(%err, "failed to query projects for push webhook");
            return WebhookSummary {
                processed: 1,
                ..Default::default()
            };
        }
    };

    let mut summary = WebhookSummary {
        processed: 1,
        ..Default::default()
    };

    for project in matching {
        if !project.auto_deploy {
            summary.builds_skipped += 1;
            continue;
        }

        let already_built =
            match build_exists_for_commit(db, project.id, &push.commit_sha).await {
                Ok(exists) => exists,
                Err(err) => {
                    warn!(%err, project_id = %project.id, "failed to check build idempotency");
                    summary.builds_skipped += 1;
                    continue;
                }
            };
        if already_built {
            summary.builds_skipped += 1;
            continue;
        }

        let result = create_build(
            db,
            encryption,
            queue,
            http_client,
            build_worker_url,
            CreateBuildInput {
                project_id: project.id,
                commit_sha: Some(push.commit_sha.clone()),
                commit_message: Some(push.commit_message.clone()),
            },
        )
        .await;

        match result {
            Ok(_) => summary.builds_triggered += 1,
            Err(err) => {
                warn!(%err, project_id = %project.id, "failed to create build from push webhook");
                summary.builds_skipped += 1;
            }
        }
    }

    summary
}

/// Handles `installation` events (spec.md §4.4): `created` upserts the
/// [`SourceInstallation`](source_installations::Model) row by its external
/// id, `deleted` removes the row and clears `installation_id` on every
/// project that referenced it. Other actions (e.g. `suspend`) are logged
/// and otherwise ignored.
async fn handle_installation(db: &DatabaseConnection, event: InstallationEvent) -> WebhookSummary {
    let result = match event.action.as_str() {
        "created" => upsert_installation(db, &event).await,
        "deleted" => delete_installation(db, &event).await,
        other => {
            info!(action = %other, installation_id = %event.installation_id, "ignoring installation webhook action");
            Ok(())
        }
    };

    if let Err(err) = result {
        warn!(%err, installation_id = %event.installation_id, "failed to process installation webhook event");
    }

    WebhookSummary {
        processed: 1,
        ..Default::default()
    }
}

async fn upsert_installation(
    db: &DatabaseConnection,
    event: &InstallationEvent,
) -> Result<(), sea_orm::DbErr> {
    let existing = SourceInstallations::find()
        .filter(
            source_installations::Column::ExternalInstallationId
                .eq(event.installation_id.clone()),
        )
        .one(db)
        .await?;

    let mut active = match existing {
        Some(model) => {
            let active: source_installations::ActiveModel = model.into();
            active
        }
        None => source_installations::ActiveModel {
            id: Set(Uuid::new_v4()),
            external_installation_id: Set(event.installation_id.clone()),
            ..Default::default()
        },
    };

    active.account_login = Set(event.account_login.clone());
    active.account_id = Set(event.account_id.clone());
    active.account_type = Set(event.account_type.clone());
    active.save(db).await?;

    Ok(())
}

async fn delete_installation(
    db: &DatabaseConnection,
    event: &InstallationEvent,
) -> Result<(), sea_orm::DbErr> {
    let existing = SourceInstallations::find()
        .filter(
            source_installations::Column::ExternalInstallationId
                .eq(event.installation_id.clone()),
        )
        .one(db)
        .await?;

    if let Some(model) = existing {
        model.delete(db).await?;
    }

    Projects::update_many()
        .col_expr(
            projects::Column::InstallationId,
            sea_orm::sea_query::Expr::value(None::<String>),
        )
        .filter(projects::Column::InstallationId.eq(event.installation_id.clone()))
        .exec(db)
        .await?;

    Ok(())
}
