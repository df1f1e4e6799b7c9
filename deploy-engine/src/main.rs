//! Deploy Engine binary: single-host activation agent that extracts
//! uploaded build artifacts, launches them (process or container mode),
//! and wires up the nginx reverse proxy (spec.md §4.3).

mod activate;
mod backend_entry;
mod container;
mod dockerfile;
mod health_check;
mod log_streamer;
mod nginx;
mod ops;
mod paths;
mod port_check;
mod proc_lifecycle;
mod project_mutex;
mod routes;
mod runtime;
mod state;
mod static_registry;
mod static_server;
mod symlink;

use std::sync::Arc;

use bollard::Docker;
use clap::Parser;
use paas_core::config::DeployEngineConfig;
use tracing_subscriber::{layer::SubscriberExt, Layer};

use project_mutex::ProjectLocks;
use state::AppState;
use static_registry::StaticServerRegistry;

#[derive(Parser)]
#[command(author, version, about = "Deploy Engine")]
struct Cli {
    #[arg(long, default_value = "info", env = "DEPLOY_ENGINE_LOG_LEVEL")]
    log_level: String,

    #[arg(long, default_value = "compact", env = "DEPLOY_ENGINE_LOG_FORMAT")]
    log_format: String,
}

fn init_tracing(level: &str, format: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .expect("invalid RUST_LOG environment variable")
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "deploy_engine={level},\
             paas_core={level},\
             paas_deployer={level},\
             hyper=warn,\
             tower=warn,\
             reqwest=warn"
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

    let config = Arc::new(DeployEngineConfig::from_env()?);
    tracing::info!(bind_addr = %config.bind_addr, use_docker = config.use_docker, "starting deploy engine");

    tokio::fs::create_dir_all(&config.artifacts_dir).await?;
    tokio::fs::create_dir_all(&config.apps_dir).await?;

    let docker = if config.use_docker {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| anyhow::anyhow!("failed to connect to docker: {e}"))?;
        Some(Arc::new(docker))
    } else {
        None
    };

    let state = AppState {
        config: config.clone(),
        project_locks: ProjectLocks::default(),
        static_servers: StaticServerRegistry::default(),
        docker: docker.clone(),
    };

    // Recovery on startup (spec.md §4.3): container mode re-attaches log
    // followers to whatever is already running rather than restarting it;
    // process mode leaves prior processes as-is since their stdout/stderr
    // pipes died with the previous deploy-engine process and cannot be
    // recovered.
    if let Some(docker) = &docker {
        let handles = container::recover_running_containers(docker, &config.control_api_url).await;
        tracing::info!(recovered = handles.len(), "re-attached container log followers");
    }

    let app = routes::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "deploy engine listening");
    axum::serve(listener, app).await?;

    Ok(())
}
