//! Environment variable CRUD with server-side encryption (spec.md §4.1
//! "Env vars: CRUD under a project with server-side encryption").

use std::collections::HashMap;

use paas_core::encryption::EncryptionService;
use paas_core::{ServiceError, ServiceResult};
use paas_entities::environment_variables::{ActiveModel, Column, Entity as EnvVars, Model};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

pub async fn set_env_var(
    db: &DatabaseConnection,
    encryption: &EncryptionService,
    project_id: Uuid,
    key: String,
    value: &str,
) -> ServiceResult<Model> {
    let ciphertext = encryption.encrypt_string(value);

    let existing = EnvVars::find()
        .filter(Column::ProjectId.eq(project_id))
        .filter(Column::Key.eq(key.clone()))
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    let model = match existing {
        Some(row) => {
            let mut active: ActiveModel = row.into();
            active.value_ciphertext = Set(ciphertext);
            active
        }
        None => ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            key: Set(key),
            value_ciphertext: Set(ciphertext),
            created_at: sea_orm::ActiveValue::NotSet,
            updated_at: sea_orm::ActiveValue::NotSet,
        },
    };

    model
        .save(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .try_into_model()
        .map_err(|e| ServiceError::database(e.to_string()))
}

pub async fn list_env_vars(
    db: &DatabaseConnection,
    project_id: Uuid,
) -> ServiceResult<Vec<Model>> {
    EnvVars::find()
        .filter(Column::ProjectId.eq(project_id))
        .all(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))
}

pub async fn delete_env_var(db: &DatabaseConnection, project_id: Uuid, key: &str) -> ServiceResult<()> {
    EnvVars::delete_many()
        .filter(Column::ProjectId.eq(project_id))
        .filter(Column::Key.eq(key))
        .exec(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;
    Ok(())
}

/// Decrypts every environment variable for a project into the plain
/// `HashMap<String, String>` carried in a [`paas_core::BuildJobData`].
pub async fn decrypted_env_map(
    db: &DatabaseConnection,
    encryption: &EncryptionService,
    project_id: Uuid,
) -> ServiceResult<HashMap<String, String>> {
    let rows = list_env_vars(db, project_id).await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.key, encryption.decrypt_string(&row.value_ciphertext)))
        .collect())
}
