use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

/// `LogEntry.level` — invariant 5 in spec.md §8: every persisted entry's
/// level is one of these five.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[sea_orm(string_value = "info")]
    Info,
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "error")]
    Error,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "deploy")]
    Deploy,
}

impl From<paas_core::LogLevel> for LogLevel {
    fn from(value: paas_core::LogLevel) -> Self {
        match value {
            paas_core::LogLevel::Info => LogLevel::Info,
            paas_core::LogLevel::Warning => LogLevel::Warning,
            paas_core::LogLevel::Error => LogLevel::Error,
            paas_core::LogLevel::Success => LogLevel::Success,
            paas_core::LogLevel::Deploy => LogLevel::Deploy,
        }
    }
}

impl From<LogLevel> for paas_core::LogLevel {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Info => paas_core::LogLevel::Info,
            LogLevel::Warning => paas_core::LogLevel::Warning,
            LogLevel::Error => paas_core::LogLevel::Error,
            LogLevel::Success => paas_core::LogLevel::Success,
            LogLevel::Deploy => paas_core::LogLevel::Deploy,
        }
    }
}

/// Append-only; indexed by `(build_id, timestamp)` for ordered retrieval
/// (spec.md §3). Deleting a build cascades its logs.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "log_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub build_id: Uuid,
    pub level: LogLevel,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub timestamp: paas_core::UtcDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::builds::Entity",
        from = "Column::BuildId",
        to = "super::builds::Column::Id"
    )]
    Build,
}

impl Related<super::builds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Build.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert && self.timestamp.is_not_set() {
            self.timestamp = Set(chrono::Utc::now());
        }
        Ok(self)
    }
}
