use std::collections::HashMap;
use std::sync::Mutex;

use paas_core::error::ServiceError;
use paas_core::types::LogLevel;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::sink::LogSink;

/// Per-build topic channel backlog (spec.md §4.1: "a bounded channel
/// (capacity 256) is used per build so that a slow subscriber lags and is
/// dropped rather than blocking the publisher").
const TOPIC_CAPACITY: usize = 256;

/// A single log line as delivered to a live subscriber.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogMessage {
    pub build_id: Uuid,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: paas_core::UtcDateTime,
}

#[derive(Error, Debug)]
pub enum SubscribeError {
    #[error("no active log topic for build {build_id}")]
    NoSuchTopic { build_id: Uuid },
}

/// Owns one `broadcast::Sender<LogMessage>` per build in progress. Topics
/// are created lazily on first publish and torn down explicitly once a
/// build reaches a terminal state, so memory does not grow unbounded
/// across the lifetime of the process.
#[derive(Default)]
pub struct LogHub {
    topics: Mutex<HashMap<Uuid, broadcast::Sender<LogMessage>>>,
}

impl LogHub {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    fn topic_sender(&self, build_id: Uuid) -> broadcast::Sender<LogMessage> {
        let mut topics = self.topics.lock().expect("log hub mutex poisoned");
        topics
            .entry(build_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }

    /// Persists the entry via `sink`, then publishes it to any live
    /// subscribers of `build_id`. A publish with zero subscribers is not
    /// an error — it simply means nobody is watching this build right now.
    pub async fn publish(
        &self,
        sink: &dyn LogSink,
        build_id: Uuid,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<(), ServiceError> {
        let message = message.into();
        sink.persist(build_id, level, &message).await?;

        let sender = self.topic_sender(build_id);
        let subscriber_count = sender.receiver_count();
        let entry = LogMessage {
            build_id,
            level,
            message,
            timestamp: chrono::Utc::now(),
        };

        // `send` only errs when there are zero receivers, which is the
        // normal case between subscriber connections — not a failure.
        if sender.send(entry).is_err() {
            debug!(%build_id, "no live subscribers for log entry");
        } else {
            debug!(%build_id, subscriber_count, "published log entry to subscribers");
        }

        Ok(())
    }

    /// Subscribes to a build's live log topic, creating it if this is the
    /// first subscriber to arrive before the first log line.
    pub fn subscribe(&self, build_id: Uuid) -> broadcast::Receiver<LogMessage> {
        self.topic_sender(build_id).subscribe()
    }

    /// Removes a build's topic once it reaches a terminal status. Any
    /// subscriber still holding a receiver will observe the channel close.
    pub fn close_topic(&self, build_id: Uuid) {
        let removed = self
            .topics
            .lock()
            .expect("log hub mutex poisoned")
            .remove(&build_id);
        if removed.is_none() {
            warn!(%build_id, "close_topic called for a build with no open topic");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingSink {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl LogSink for RecordingSink {
        async fn persist(
            &self,
            _build_id: Uuid,
            _level: LogLevel,
            _message: &str,
        ) -> Result<(), ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn publish_persists_then_delivers_to_subscriber() {
        let hub = LogHub::new();
        let build_id = Uuid::new_v4();
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = RecordingSink {
            calls: calls.clone(),
        };

        let mut rx = hub.subscribe(build_id);
        hub.publish(&sink, build_id, LogLevel::Info, "building...")
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.build_id, build_id);
        assert_eq!(received.message, "building...");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let hub = LogHub::new();
        let sink = RecordingSink {
            calls: Arc::new(AtomicUsize::new(0)),
        };
        hub.publish(&sink, Uuid::new_v4(), LogLevel::Error, "boom")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn close_topic_disconnects_subscribers() {
        let hub = LogHub::new();
        let build_id = Uuid::new_v4();
        let mut rx = hub.subscribe(build_id);
        hub.close_topic(build_id);

        let err = rx.recv().await.unwrap_err();
        assert!(matches!(err, broadcast::error::RecvError::Closed));
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking_publisher() {
        let hub = LogHub::new();
        let build_id = Uuid::new_v4();
        let sink = RecordingSink {
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let mut rx = hub.subscribe(build_id);

        for i in 0..(TOPIC_CAPACITY + 10) {
            hub.publish(&sink, build_id, LogLevel::Info, format!("line {i}"))
                .await
                .unwrap();
        }

        let err = rx.recv().await.unwrap_err();
        assert!(matches!(err, broadcast::error::RecvError::Lagged(_)));
    }
}
