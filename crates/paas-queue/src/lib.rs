//! The build job queue (spec.md §4.1 "Queue submission", §5).
//!
//! A single-writer, single-reader mpsc channel carrying [`BuildJobData`]
//! from Control Plane to one Build Worker consumer loop. Concurrency 1 is
//! enforced structurally: the receiving half is handed to exactly one
//! consumer (`BuildQueue::into_receiver`), so only one job can be in flight
//! per worker process, matching `temps-queue`'s `QueueService` /
//! `JobReceiver` split.

mod queue;

pub use queue::{BuildQueue, BuildQueueError, JobReceiver, QueuedJob, RetentionLists};

pub use paas_core::types::BuildJobData;
