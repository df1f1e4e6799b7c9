//! Environment-backed configuration, validated eagerly at startup rather
//! than at first use (spec.md §9 design note on the encryption key).

use anyhow::{anyhow, Context, Result};
use std::env;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Configuration for the Control Plane binary.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub encryption_key: String,
    pub deploy_engine_url: String,
    pub build_worker_url: String,
    pub github_webhook_secret: String,
    pub github_app_id: Option<String>,
    pub github_app_private_key_path: Option<String>,
    pub base_domain: Option<String>,
    pub environment: String,
}

impl ControlPlaneConfig {
    pub fn from_env() -> Result<Self> {
        let encryption_key = env::var("ENCRYPTION_KEY")
            .context("ENCRYPTION_KEY must be set (32 bytes or 64 hex chars)")?;
        // Fail fast: the same check `EncryptionService::new` performs, run
        // before the server accepts a single request.
        if encryption_key.len() != 32 && encryption_key.len() != 64 {
            return Err(anyhow!(
                "ENCRYPTION_KEY must be exactly 32 bytes or 64 hex characters"
            ));
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:4000"),
            encryption_key,
            deploy_engine_url: env_or("DEPLOY_ENGINE_URL", "http://127.0.0.1:4001"),
            build_worker_url: env_or("BUILD_WORKER_URL", "http://127.0.0.1:4002"),
            github_webhook_secret: env::var("GITHUB_WEBHOOK_SECRET").unwrap_or_default(),
            github_app_id: env::var("GITHUB_APP_ID").ok(),
            github_app_private_key_path: env::var("GITHUB_APP_PRIVATE_KEY_PATH").ok(),
            base_domain: env::var("BASE_DOMAIN").ok(),
            environment: env_or("NODE_ENV", "development"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration for the Build Worker binary.
#[derive(Debug, Clone)]
pub struct BuildWorkerConfig {
    pub control_api_url: String,
    pub deploy_engine_url: String,
    pub bind_addr: String,
    pub workspace_root: std::path::PathBuf,
    pub github_app_id: Option<String>,
    pub github_app_private_key_path: Option<String>,
}

impl BuildWorkerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            control_api_url: env_or("CONTROL_API_URL", "http://127.0.0.1:4000"),
            deploy_engine_url: env_or("DEPLOY_ENGINE_URL", "http://127.0.0.1:4001"),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:4002"),
            workspace_root: env_or("WORKSPACE_ROOT", "./workspace").into(),
            github_app_id: env::var("GITHUB_APP_ID").ok(),
            github_app_private_key_path: env::var("GITHUB_APP_PRIVATE_KEY_PATH").ok(),
        })
    }
}

/// Configuration for the Deploy Engine binary.
#[derive(Debug, Clone)]
pub struct DeployEngineConfig {
    pub bind_addr: String,
    pub control_api_url: String,
    pub base_domain: Option<String>,
    pub artifacts_dir: std::path::PathBuf,
    pub apps_dir: std::path::PathBuf,
    pub use_docker: bool,
    pub nginx_sites_dir: std::path::PathBuf,
}

impl DeployEngineConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:4001"),
            control_api_url: env_or("CONTROL_API_URL", "http://127.0.0.1:4000"),
            base_domain: env::var("BASE_DOMAIN").ok(),
            artifacts_dir: env_or("ARTIFACTS_DIR", "/tmp/deploy-artifacts").into(),
            apps_dir: env_or("APPS_DIR", "./apps").into(),
            use_docker: env_or("USE_DOCKER", "false") == "true",
            nginx_sites_dir: env_or("NGINX_SITES_DIR", "/etc/nginx/sites-available").into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_encryption_key_of_wrong_length() {
        std::env::set_var("ENCRYPTION_KEY", "too-short");
        std::env::set_var("DATABASE_URL", "sqlite::memory:");
        let result = ControlPlaneConfig::from_env();
        assert!(result.is_err());
        std::env::remove_var("ENCRYPTION_KEY");
        std::env::remove_var("DATABASE_URL");
    }
}
