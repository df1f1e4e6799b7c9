use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

/// `Build.status` — the `pending -> building -> {success, failed}` DAG
/// from spec.md §3.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "building")]
    Building,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl From<BuildStatus> for paas_core::BuildStatus {
    fn from(value: BuildStatus) -> Self {
        match value {
            BuildStatus::Pending => paas_core::BuildStatus::Pending,
            BuildStatus::Building => paas_core::BuildStatus::Building,
            BuildStatus::Success => paas_core::BuildStatus::Success,
            BuildStatus::Failed => paas_core::BuildStatus::Failed,
        }
    }
}

impl From<paas_core::BuildStatus> for BuildStatus {
    fn from(value: paas_core::BuildStatus) -> Self {
        match value {
            paas_core::BuildStatus::Pending => BuildStatus::Pending,
            paas_core::BuildStatus::Building => BuildStatus::Building,
            paas_core::BuildStatus::Success => BuildStatus::Success,
            paas_core::BuildStatus::Failed => BuildStatus::Failed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "builds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub status: BuildStatus,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub artifact_id: Option<Uuid>,
    pub created_at: paas_core::UtcDateTime,
    pub completed_at: Option<paas_core::UtcDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id"
    )]
    Project,
    #[sea_orm(has_many = "super::log_entries::Entity")]
    LogEntries,
    #[sea_orm(has_many = "super::deployments::Entity")]
    Deployments,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::log_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LogEntries.def()
    }
}

impl Related<super::deployments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deployments.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(chrono::Utc::now());
        }
        Ok(self)
    }
}
