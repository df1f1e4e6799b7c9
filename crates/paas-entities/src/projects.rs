use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

/// `Project.framework` — see spec.md §3.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[sea_orm(string_value = "nextjs")]
    Nextjs,
    #[sea_orm(string_value = "vite")]
    Vite,
    #[sea_orm(string_value = "express")]
    Express,
    #[sea_orm(string_value = "hono")]
    Hono,
    #[sea_orm(string_value = "elysia")]
    Elysia,
}

impl From<Framework> for paas_core::Framework {
    fn from(value: Framework) -> Self {
        match value {
            Framework::Nextjs => paas_core::Framework::Nextjs,
            Framework::Vite => paas_core::Framework::Vite,
            Framework::Express => paas_core::Framework::Express,
            Framework::Hono => paas_core::Framework::Hono,
            Framework::Elysia => paas_core::Framework::Elysia,
        }
    }
}

impl From<paas_core::Framework> for Framework {
    fn from(value: paas_core::Framework) -> Self {
        match value {
            paas_core::Framework::Nextjs => Framework::Nextjs,
            paas_core::Framework::Vite => Framework::Vite,
            paas_core::Framework::Express => Framework::Express,
            paas_core::Framework::Hono => Framework::Hono,
            paas_core::Framework::Elysia => Framework::Elysia,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub repo_url: String,
    pub repo_id: Option<String>,
    pub default_branch: String,
    pub root_directory: String,
    pub build_command: String,
    pub framework: Framework,
    pub domain: Option<String>,
    #[sea_orm(unique)]
    pub port: i32,
    pub installation_id: Option<String>,
    pub auto_deploy: bool,
    pub created_at: paas_core::UtcDateTime,
    pub updated_at: paas_core::UtcDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::builds::Entity")]
    Builds,
    #[sea_orm(has_many = "super::deployments::Entity")]
    Deployments,
    #[sea_orm(has_many = "super::environment_variables::Entity")]
    EnvironmentVariables,
}

impl Related<super::builds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Builds.def()
    }
}

impl Related<super::deployments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deployments.def()
    }
}

impl Related<super::environment_variables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EnvironmentVariables.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();
        if insert {
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.updated_at.is_not_set() {
                self.updated_at = Set(now);
            }
        } else {
            self.updated_at = Set(now);
        }
        Ok(self)
    }
}
