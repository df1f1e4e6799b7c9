//! Per-build log buffering and flush (spec.md §4.2 "Log streamer"):
//! entries are buffered, flushed every 300 ms or on explicit completion,
//! grouped by level so each POST to Control Plane retains a single level.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use paas_core::LogLevel;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

const FLUSH_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Serialize)]
struct LogBatchRequest {
    logs: String,
    level: LogLevel,
}

struct Buffer {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

/// Streams lines for a single build to Control Plane's internal logs
/// endpoint. Cloning shares the same underlying buffer, so the command
/// executor and the procedural steps around it can all push lines through
/// the same streamer.
#[derive(Clone)]
pub struct LogStreamer {
    buffer: Arc<Buffer>,
    client: reqwest::Client,
    endpoint: String,
}

impl LogStreamer {
    /// Creates a streamer and spawns its background 300 ms flush loop.
    /// The returned `JoinHandle` must be awaited (after calling
    /// [`LogStreamer::finish`]) to guarantee the final flush lands before
    /// the worker moves on.
    pub fn spawn(control_api_url: &str, build_id: Uuid) -> (Self, JoinHandle<()>) {
        let streamer = Self {
            buffer: Arc::new(Buffer {
                entries: Mutex::new(Vec::new()),
            }),
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/builds/{}/logs",
                control_api_url.trim_end_matches('/'),
                build_id
            ),
        };

        let ticker = streamer.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);
            loop {
                interval.tick().await;
                ticker.flush().await;
            }
        });

        (streamer, handle)
    }

    /// Synchronous on purpose: called from the blocking line-callback in
    /// `command::run_with_timeout`, which cannot await a lock without
    /// risking reordering lines across spawned tasks.
    pub fn push(&self, level: LogLevel, message: impl Into<String>) {
        self.buffer
            .entries
            .lock()
            .expect("log buffer mutex poisoned")
            .push((level, message.into()));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    async fn flush(&self) {
        let drained: Vec<(LogLevel, String)> = {
            let mut entries = self.buffer.entries.lock().expect("log buffer mutex poisoned");
            if entries.is_empty() {
                return;
            }
            std::mem::take(&mut *entries)
        };

        let mut by_level: HashMap<LogLevel, Vec<String>> = HashMap::new();
        for (level, message) in drained {
            by_level.entry(level).or_default().push(message);
        }

        for (level, lines) in by_level {
            let body = LogBatchRequest {
                logs: lines.join("\n"),
                level,
            };
            if let Err(err) = self.client.post(&self.endpoint).json(&body).send().await {
                // Flush failures are logged to the worker's own stderr and
                // do not block the build (spec.md §4.2).
                eprintln!("log flush failed: {err}");
            }
        }
    }

    /// Performs the final flush and stops the background ticker. Call
    /// this on both success and failure paths so no buffered lines are
    /// lost at build completion.
    pub async fn finish(self, ticker: JoinHandle<()>) {
        ticker.abort();
        self.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn groups_buffered_entries_by_level() {
        let (streamer, ticker) = LogStreamer::spawn("http://127.0.0.1:1", Uuid::new_v4());
        streamer.info("first");
        streamer.push(LogLevel::Error, "boom");
        streamer.info("second");

        let entries = streamer.buffer.entries.lock().unwrap().clone();
        assert_eq!(entries.len(), 3);
        streamer.finish(ticker).await;
    }
}
