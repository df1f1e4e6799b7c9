use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use paas_core::types::BuildJobData;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Jobs auto-expire from the completed/failed retention lists after these
/// many entries (spec.md §5 "Queue ... jobs auto-expire from the
/// 'completed' and 'failed' retention lists after configured counts
/// (100/50 respectively)").
const COMPLETED_RETENTION: usize = 100;
const FAILED_RETENTION: usize = 50;

#[derive(Error, Debug)]
pub enum BuildQueueError {
    #[error("queue channel closed, job {build_id} was not accepted")]
    ChannelClosed { build_id: Uuid },

    #[error("build {build_id} is already enqueued")]
    DuplicateJob { build_id: Uuid },
}

/// A `BuildJobData` wrapped with the moment it entered the queue.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub data: BuildJobData,
    pub enqueued_at: paas_core::UtcDateTime,
}

/// The receiving half of a [`BuildQueue`]. Exactly one instance exists per
/// worker process, matching "Build Worker ... executing at most one at a
/// time per worker process (concurrency 1)" (spec.md §4.2).
pub struct JobReceiver {
    inner: mpsc::Receiver<QueuedJob>,
}

impl JobReceiver {
    pub async fn recv(&mut self) -> Option<QueuedJob> {
        let job = self.inner.recv().await;
        match &job {
            Some(j) => debug!(build_id = %j.data.build_id, "dequeued build job"),
            None => warn!("build queue closed, no more jobs will arrive"),
        }
        job
    }
}

/// Bounded FIFO retention of build ids that reached a terminal state,
/// used for observability/admin listing rather than re-delivery.
pub struct RetentionLists {
    completed: Mutex<VecDeque<Uuid>>,
    failed: Mutex<VecDeque<Uuid>>,
}

impl RetentionLists {
    fn new() -> Self {
        Self {
            completed: Mutex::new(VecDeque::with_capacity(COMPLETED_RETENTION)),
            failed: Mutex::new(VecDeque::with_capacity(FAILED_RETENTION)),
        }
    }

    fn push_bounded(deque: &Mutex<VecDeque<Uuid>>, build_id: Uuid, cap: usize) {
        let mut guard = deque.lock().expect("retention list mutex poisoned");
        guard.push_back(build_id);
        while guard.len() > cap {
            guard.pop_front();
        }
    }

    pub fn record_completed(&self, build_id: Uuid) {
        Self::push_bounded(&self.completed, build_id, COMPLETED_RETENTION);
    }

    pub fn record_failed(&self, build_id: Uuid) {
        Self::push_bounded(&self.failed, build_id, FAILED_RETENTION);
    }

    pub fn completed(&self) -> Vec<Uuid> {
        self.completed
            .lock()
            .expect("retention list mutex poisoned")
            .iter()
            .copied()
            .collect()
    }

    pub fn failed(&self) -> Vec<Uuid> {
        self.failed
            .lock()
            .expect("retention list mutex poisoned")
            .iter()
            .copied()
            .collect()
    }
}

/// The build job queue owned by Control Plane. `enqueue` is idempotent on
/// `build_id`: a duplicate enqueue (e.g. a retried webhook) is rejected
/// rather than delivered twice, per spec.md §4.1 "enqueues it using the
/// build_id as the stable job id (idempotent enqueue)".
pub struct BuildQueue {
    sender: mpsc::Sender<QueuedJob>,
    in_flight: Mutex<HashSet<Uuid>>,
    retention: RetentionLists,
}

impl BuildQueue {
    /// Creates a queue and its single consumer handle. The receiver must be
    /// kept alive by the worker loop; dropping it turns every subsequent
    /// `enqueue` into a `ChannelClosed` error.
    pub fn new(buffer_size: usize) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (
            Self {
                sender,
                in_flight: Mutex::new(HashSet::new()),
                retention: RetentionLists::new(),
            },
            JobReceiver { inner: receiver },
        )
    }

    pub fn retention(&self) -> &RetentionLists {
        &self.retention
    }

    pub async fn enqueue(&self, data: BuildJobData) -> Result<(), BuildQueueError> {
        let build_id = data.build_id;
        {
            let mut in_flight = self.in_flight.lock().expect("queue mutex poisoned");
            if !in_flight.insert(build_id) {
                return Err(BuildQueueError::DuplicateJob { build_id });
            }
        }

        let job = QueuedJob {
            data,
            enqueued_at: chrono::Utc::now(),
        };

        if self.sender.send(job).await.is_err() {
            error!(%build_id, "queue channel closed while enqueuing");
            self.in_flight
                .lock()
                .expect("queue mutex poisoned")
                .remove(&build_id);
            return Err(BuildQueueError::ChannelClosed { build_id });
        }

        debug!(%build_id, "enqueued build job");
        Ok(())
    }

    /// Marks a build as having left the in-flight set, recording it in the
    /// completed or failed retention list. Called by Control Plane once it
    /// observes the terminal `PUT build {status}` from the worker.
    pub fn mark_terminal(&self, build_id: Uuid, succeeded: bool) {
        self.in_flight
            .lock()
            .expect("queue mutex poisoned")
            .remove(&build_id);
        if succeeded {
            self.retention.record_completed(build_id);
        } else {
            self.retention.record_failed(build_id);
        }
    }

    /// Drops every job not yet claimed by the consumer, used by the admin
    /// `DELETE /builds/queue` endpoint (spec.md §6). Jobs already taken by
    /// `recv` are unaffected.
    pub fn is_in_flight(&self, build_id: Uuid) -> bool {
        self.in_flight
            .lock()
            .expect("queue mutex poisoned")
            .contains(&build_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_job(build_id: Uuid) -> BuildJobData {
        BuildJobData {
            build_id,
            project_id: Uuid::new_v4(),
            repo_url: "https://example.com/repo.git".to_string(),
            build_command: "npm run build".to_string(),
            root_directory: "./".to_string(),
            framework: paas_core::types::Framework::Vite,
            env_vars: HashMap::new(),
            installation_id: None,
        }
    }

    #[tokio::test]
    async fn enqueue_then_recv_delivers_the_job() {
        let (queue, mut receiver) = BuildQueue::new(8);
        let build_id = Uuid::new_v4();
        queue.enqueue(sample_job(build_id)).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.data.build_id, build_id);
    }

    #[tokio::test]
    async fn duplicate_build_id_is_rejected() {
        let (queue, _receiver) = BuildQueue::new(8);
        let build_id = Uuid::new_v4();
        queue.enqueue(sample_job(build_id)).await.unwrap();

        let err = queue.enqueue(sample_job(build_id)).await.unwrap_err();
        assert!(matches!(err, BuildQueueError::DuplicateJob { .. }));
    }

    #[tokio::test]
    async fn mark_terminal_clears_in_flight_and_allows_requeue() {
        let (queue, mut receiver) = BuildQueue::new(8);
        let build_id = Uuid::new_v4();
        queue.enqueue(sample_job(build_id)).await.unwrap();
        receiver.recv().await.unwrap();

        assert!(queue.is_in_flight(build_id));
        queue.mark_terminal(build_id, true);
        assert!(!queue.is_in_flight(build_id));

        // Same build_id may legitimately recur (e.g. a manual re-run),
        // so it must be enqueue-able again once no longer in flight.
        queue.enqueue(sample_job(build_id)).await.unwrap();
    }

    #[tokio::test]
    async fn retention_lists_are_bounded() {
        let (queue, _receiver) = BuildQueue::new(8);
        for _ in 0..(COMPLETED_RETENTION + 10) {
            queue.retention().record_completed(Uuid::new_v4());
        }
        assert_eq!(queue.retention().completed().len(), COMPLETED_RETENTION);

        for _ in 0..(FAILED_RETENTION + 10) {
            queue.retention().record_failed(Uuid::new_v4());
        }
        assert_eq!(queue.retention().failed().len(), FAILED_RETENTION);
    }

    #[tokio::test]
    async fn enqueue_after_receiver_dropped_returns_channel_closed() {
        let (queue, receiver) = BuildQueue::new(8);
        drop(receiver);

        let err = queue.enqueue(sample_job(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, BuildQueueError::ChannelClosed { .. }));
    }
}
