use sea_orm_migration::prelude::*;

/// Creates the six tables of the build-and-deploy data model (spec.md §3):
/// projects, builds, deployments, log_entries, environment_variables,
/// source_installations.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("projects"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("repo_url")).string().not_null())
                    .col(ColumnDef::new(Alias::new("repo_id")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("default_branch"))
                            .string()
                            .not_null()
                            .default("main"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("root_directory"))
                            .string()
                            .not_null()
                            .default("./"),
                    )
                    .col(ColumnDef::new(Alias::new("build_command")).string().not_null())
                    .col(ColumnDef::new(Alias::new("framework")).string().not_null())
                    .col(ColumnDef::new(Alias::new("domain")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("port"))
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("installation_id")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("auto_deploy"))
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("builds"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("project_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("status")).string().not_null())
                    .col(ColumnDef::new(Alias::new("commit_sha")).string().null())
                    .col(ColumnDef::new(Alias::new("commit_message")).string().null())
                    .col(ColumnDef::new(Alias::new("artifact_id")).uuid().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("completed_at"))
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("builds"), Alias::new("project_id"))
                            .to(Alias::new("projects"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_builds_project_commit")
                    .table(Alias::new("builds"))
                    .col(Alias::new("project_id"))
                    .col(Alias::new("commit_sha"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("deployments"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("project_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("build_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("status")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("activated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("deployments"), Alias::new("project_id"))
                            .to(Alias::new("projects"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("deployments"), Alias::new("build_id"))
                            .to(Alias::new("builds"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Invariant 1 (spec.md §8): at most one active deployment per
        // project. A partial unique index enforces it at the storage
        // layer as a defense-in-depth backstop to the transactional
        // promotion in the activation service; SQLite (used in tests)
        // does not support partial indexes via this builder, so the
        // invariant there is enforced purely by the transaction.
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX idx_deployments_one_active_per_project \
                     ON deployments (project_id) WHERE status = 'active'",
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("log_entries"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("build_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("level")).string().not_null())
                    .col(ColumnDef::new(Alias::new("message")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("timestamp"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("log_entries"), Alias::new("build_id"))
                            .to(Alias::new("builds"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_log_entries_build_timestamp")
                    .table(Alias::new("log_entries"))
                    .col(Alias::new("build_id"))
                    .col(Alias::new("timestamp"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("environment_variables"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("project_id")).uuid().not_null())
                    .col(ColumnDef::new(Alias::new("key")).string().not_null())
                    .col(ColumnDef::new(Alias::new("value_ciphertext")).text().not_null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Alias::new("environment_variables"), Alias::new("project_id"))
                            .to(Alias::new("projects"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_env_vars_project_key")
                    .table(Alias::new("environment_variables"))
                    .col(Alias::new("project_id"))
                    .col(Alias::new("key"))
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("source_installations"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Alias::new("external_installation_id"))
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("account_login")).string().not_null())
                    .col(ColumnDef::new(Alias::new("account_id")).string().not_null())
                    .col(ColumnDef::new(Alias::new("account_type")).string().not_null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("source_installations")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("environment_variables")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("log_entries")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("deployments")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("builds")).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alias::new("projects")).to_owned())
            .await?;
        Ok(())
    }
}
