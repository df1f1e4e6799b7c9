//! [`LogSink`] implementation backing the log hub with persistence to
//! `log_entries` (spec.md §4.1 "Build logs").

use async_trait::async_trait;
use paas_core::error::ServiceError;
use paas_core::LogLevel;
use paas_entities::log_entries::ActiveModel;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use uuid::Uuid;

pub struct DbLogSink {
    db: DatabaseConnection,
}

impl DbLogSink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl paas_logs::LogSink for DbLogSink {
    async fn persist(
        &self,
        build_id: Uuid,
        level: LogLevel,
        message: &str,
    ) -> Result<(), ServiceError> {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            build_id: Set(build_id),
            level: Set(level.into()),
            message: Set(message.to_string()),
            timestamp: sea_orm::ActiveValue::NotSet,
        }
        .insert(&self.db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;
        Ok(())
    }
}
