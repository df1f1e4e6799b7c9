use std::sync::Arc;

use bollard::Docker;
use paas_core::config::DeployEngineConfig;

use crate::project_mutex::ProjectLocks;
use crate::static_registry::StaticServerRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DeployEngineConfig>,
    pub project_locks: ProjectLocks,
    pub static_servers: StaticServerRegistry,
    /// `Some` only when `use_docker` selects container mode at startup
    /// (spec.md §4.3: "Operates in one of two modes selected at startup").
    pub docker: Option<Arc<Docker>>,
}

impl AppState {
    pub fn is_container_mode(&self) -> bool {
        self.docker.is_some()
    }
}
