//! Forwards a running deployment's stdout/stderr into Control Plane's log
//! pipeline at `level=deploy` (spec.md glossary: "Deploy" log level is
//! reserved for deployment lifecycle events). Mirrors Build Worker's own
//! log streamer (periodic buffered flush) but fixed to a single level
//! since deployment output does not carry Build Worker's info/error split.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use paas_core::LogLevel;
use serde::Serialize;
use uuid::Uuid;

const FLUSH_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Serialize)]
struct LogBatchRequest {
    logs: String,
    level: LogLevel,
}

#[derive(Clone)]
pub struct DeployLogStreamer {
    buffer: Arc<Mutex<Vec<String>>>,
    client: reqwest::Client,
    endpoint: String,
}

impl DeployLogStreamer {
    pub fn spawn(control_api_url: &str, build_id: Uuid) -> Self {
        let streamer = Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/builds/{}/logs",
                control_api_url.trim_end_matches('/'),
                build_id
            ),
        };

        let ticker = streamer.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);
            loop {
                interval.tick().await;
                ticker.flush().await;
            }
        });

        streamer
    }

    pub fn push(&self, line: impl Into<String>) {
        self.buffer
            .lock()
            .expect("deploy log buffer mutex poisoned")
            .push(line.into());
    }

    async fn flush(&self) {
        let drained: Vec<String> = {
            let mut buffer = self.buffer.lock().expect("deploy log buffer mutex poisoned");
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        let body = LogBatchRequest {
            logs: drained.join("\n"),
            level: LogLevel::Deploy,
        };
        if let Err(err) = self.client.post(&self.endpoint).json(&body).send().await {
            eprintln!("deploy log flush failed: {err}");
        }
    }
}
