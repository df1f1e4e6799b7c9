use std::sync::Arc;

use paas_core::config::ControlPlaneConfig;
use paas_core::encryption::EncryptionService;
use paas_deployer::Deployer;
use paas_logs::LogHub;
use paas_queue::BuildQueue;
use sea_orm::DatabaseConnection;

/// Shared application state handed to every Axum handler, built once at
/// startup (spec.md §9 design note: "singleton services become explicit
/// constructor-injected dependencies").
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ControlPlaneConfig>,
    pub encryption: Arc<EncryptionService>,
    pub queue: Arc<BuildQueue>,
    pub log_hub: Arc<LogHub>,
    pub deployer: Arc<dyn Deployer>,
    /// Dispatches queued jobs to the Build Worker's `POST /build` fallback
    /// endpoint (spec.md §4.2). Control Plane and Build Worker are
    /// separate processes, so the in-process `BuildQueue` channel only
    /// provides in-flight dedup/retention bookkeeping here; the HTTP call
    /// is what actually hands the job across the process boundary.
    pub http_client: reqwest::Client,
}
