//! Build Worker binary: dequeues build jobs and runs the clone/build/
//! package/upload procedure at concurrency 1 (spec.md §4.2, §5).

mod command;
mod control_client;
mod http;
mod job;
mod log_streamer;
mod package_json;

use std::sync::Arc;

use clap::Parser;
use paas_core::config::BuildWorkerConfig;
use paas_queue::BuildQueue;
use tracing_subscriber::{layer::SubscriberExt, Layer};

use http::WorkerHttpState;

/// Matches Control Plane's own bounded-channel sizing rationale: a
/// runaway dispatcher applies backpressure rather than growing memory.
const QUEUE_BUFFER_SIZE: usize = 64;

#[derive(Parser)]
#[command(author, version, about = "Build Worker")]
struct Cli {
    #[arg(long, default_value = "info", env = "BUILD_WORKER_LOG_LEVEL")]
    log_level: String,

    #[arg(long, default_value = "compact", env = "BUILD_WORKER_LOG_FORMAT")]
    log_format: String,
}

fn init_tracing(level: &str, format: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .expect("invalid RUST_LOG environment variable")
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "build_worker={level},\
             paas_core={level},\
             paas_queue={level},\
             paas_deployer={level},\
             paas_git={level},\
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

    let config = Arc::new(BuildWorkerConfig::from_env()?);
    tracing::info!(bind_addr = %config.bind_addr, "starting build worker");

    tokio::fs::create_dir_all(&config.workspace_root).await?;

    let (queue, mut receiver) = BuildQueue::new(QUEUE_BUFFER_SIZE);
    let queue = Arc::new(queue);

    // Strict concurrency 1 (spec.md §5): a single task owns the receiver
    // and awaits each job to completion before pulling the next one.
    let worker_config = config.clone();
    let worker_queue = queue.clone();
    tokio::spawn(async move {
        while let Some(queued) = receiver.recv().await {
            let build_id = queued.data.build_id;
            let succeeded = job::run_job(&worker_config, queued.data).await;
            worker_queue.mark_terminal(build_id, succeeded);
        }
    });

    let http_state = WorkerHttpState { queue };
    let app = http::routes(http_state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "build worker listening");
    axum::serve(listener, app).await?;

    Ok(())
}
