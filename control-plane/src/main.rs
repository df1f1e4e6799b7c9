//! Control Plane binary: REST surface, webhook ingester, job enqueuer, and
//! log fan-out hub (spec.md §2).

mod dto;
mod log_sink;
mod routes;
mod services;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use paas_core::config::ControlPlaneConfig;
use paas_core::EncryptionService;
use paas_deployer::{Deployer, HttpDeployer};
use paas_logs::LogHub;
use paas_migrations::{Migrator, MigratorTrait};
use paas_queue::BuildQueue;
use sea_orm::{ConnectOptions, Database};
use tracing_subscriber::{layer::SubscriberExt, Layer};

use state::AppState;

/// Channel capacity for the in-process build queue (spec.md §4.1 "Queue
/// submission"): bounded so a runaway producer applies backpressure
/// rather than growing memory unbounded.
const QUEUE_BUFFER_SIZE: usize = 256;

#[derive(Parser)]
#[command(author, version, about = "Control Plane API server")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "CONTROL_PLANE_LOG_LEVEL")]
    log_level: String,

    /// Log format: compact, full
    #[arg(long, default_value = "compact", env = "CONTROL_PLANE_LOG_FORMAT")]
    log_format: String,
}

fn init_tracing(level: &str, format: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .expect("invalid RUST_LOG environment variable")
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "control_plane={level},\
             paas_core={level},\
             paas_entities={level},\
             paas_migrations={level},\
             paas_queue={level},\
             paas_logs={level},\
             paas_deployer={level},\
             paas_git={level},\
             sqlx=warn,\
             sea_orm=warn,\
             hyper=warn,\
             tower=warn,\
             reqwest=warn",
            level = level
        ))
    };

    let fmt_layer = match format {
        "full" => tracing_subscriber::fmt::layer().with_target(true).boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set global default tracing subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format);

    let config = ControlPlaneConfig::from_env()?;
    tracing::info!(bind_addr = %config.bind_addr, environment = %config.environment, "starting control plane");

    let mut connect_options = ConnectOptions::new(config.database_url.clone());
    connect_options
        .max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(connect_options).await?;
    Migrator::up(&db, None).await?;

    let encryption = Arc::new(EncryptionService::new(&config.encryption_key)?);
    let (queue, receiver) = BuildQueue::new(QUEUE_BUFFER_SIZE);
    let queue = Arc::new(queue);
    let log_hub = Arc::new(LogHub::new());
    let deployer: Arc<dyn Deployer> = Arc::new(HttpDeployer::new(config.deploy_engine_url.clone()));

    // Build Worker runs as a separate process, so job dispatch happens over
    // HTTP (services::builds::dispatch_to_worker), not through this mpsc
    // channel. `BuildQueue` is kept only for its in-flight/retention
    // bookkeeping (mark_terminal); the receiver has no consumer and is
    // dropped immediately.
    drop(receiver);

    let state = AppState {
        db,
        config: Arc::new(config.clone()),
        encryption,
        queue,
        log_hub,
        deployer,
        http_client: reqwest::Client::new(),
    };

    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "control plane listening");
    axum::serve(listener, app).await?;

    Ok(())
}
