//! Deployment activation, the exactly-one-active-deployment invariant, and
//! stop (spec.md §4.1 "Deployments", §3 invariant, §5 "Database
//! transactions").

use std::collections::HashMap;

use paas_core::types::{BuildStatus, Framework};
use paas_core::{ServiceError, ServiceResult};
use paas_deployer::{ActivateRequest, Deployer, StopRequest};
use paas_entities::builds::Entity as Builds;
use paas_entities::deployments::{self, ActiveModel, Entity as Deployments};
use paas_entities::projects::Entity as Projects;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};
use uuid::Uuid;

/// Promotes `build_id` to the project's active deployment. Deactivating
/// any prior active deployment and inserting the new one happens in one
/// transaction (spec.md §5 "Deployment activation (deactivate prior +
/// insert new) MUST run in one transaction"), and only after Deploy
/// Engine confirms the new deployment is healthy.
pub async fn activate_build(
    db: &DatabaseConnection,
    deployer: &dyn Deployer,
    build_id: Uuid,
    env_vars: HashMap<String, String>,
) -> ServiceResult<deployments::Model> {
    let build = Builds::find_by_id(build_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found(format!("build {build_id}")))?;

    let status: BuildStatus = build.status.into();
    if status != BuildStatus::Success {
        return Err(ServiceError::validation(format!(
            "build {build_id} is {status}, only a successful build can be activated"
        )));
    }

    let project = Projects::find_by_id(build.project_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found(format!("project {}", build.project_id)))?;

    let port = u16::try_from(project.port).map_err(|_| ServiceError::database("invalid port"))?;
    let subdomain = project
        .domain
        .as_ref()
        .and_then(|d| d.split('.').next())
        .map(str::to_string);

    let response = deployer
        .activate(ActivateRequest {
            project_id: project.id,
            build_id,
            port,
            app_type: Framework::from(project.framework),
            subdomain,
            env_vars,
        })
        .await
        .map_err(|e| ServiceError::deployment(e.to_string()))?;

    if !response.healthy {
        return Err(ServiceError::deployment(format!(
            "build {build_id} failed its post-activation health check"
        )));
    }

    let txn = db
        .begin()
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    Deployments::update_many()
        .col_expr(
            deployments::Column::Status,
            sea_orm::sea_query::Expr::value(deployments::DeploymentStatus::Inactive),
        )
        .filter(deployments::Column::ProjectId.eq(project.id))
        .filter(deployments::Column::Status.eq(deployments::DeploymentStatus::Active))
        .exec(&txn)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    let deployment = ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project.id),
        build_id: Set(build_id),
        status: Set(deployments::DeploymentStatus::Active),
        activated_at: sea_orm::ActiveValue::NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|e| ServiceError::database(e.to_string()))?;

    txn.commit()
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    Ok(deployment)
}

pub async fn get_active_deployment(
    db: &DatabaseConnection,
    project_id: Uuid,
) -> ServiceResult<Option<deployments::Model>> {
    Deployments::find()
        .filter(deployments::Column::ProjectId.eq(project_id))
        .filter(deployments::Column::Status.eq(deployments::DeploymentStatus::Active))
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))
}

pub async fn stop_deployment(
    db: &DatabaseConnection,
    deployer: &dyn Deployer,
    project_id: Uuid,
) -> ServiceResult<()> {
    let project = Projects::find_by_id(project_id)
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found(format!("project {project_id}")))?;

    let port = u16::try_from(project.port).map_err(|_| ServiceError::database("invalid port"))?;

    deployer
        .stop(StopRequest {
            port,
            project_id: Some(project_id),
            build_id: None,
        })
        .await
        .map_err(|e| ServiceError::deployment(e.to_string()))?;

    Deployments::update_many()
        .col_expr(
            deployments::Column::Status,
            sea_orm::sea_query::Expr::value(deployments::DeploymentStatus::Inactive),
        )
        .filter(deployments::Column::ProjectId.eq(project_id))
        .filter(deployments::Column::Status.eq(deployments::DeploymentStatus::Active))
        .exec(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    Ok(())
}
