//! Per-project serialization (spec.md §5 "Per-project serialization"):
//! "All activate/stop/delete operations for a given project acquire a
//! per-project mutex in Deploy Engine ... The mutex is released on all
//! exit paths (normal and error)."

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct ProjectLocks {
    registry: Arc<StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `project_id`, creating its entry on first
    /// use. Held by the returned guard's lifetime — dropping it (on any
    /// return path, including `?`) releases the lock.
    pub async fn lock(&self, project_id: Uuid) -> OwnedMutexGuard<()> {
        let entry = {
            let mut registry = self.registry.lock().expect("project lock registry poisoned");
            registry
                .entry(project_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn different_projects_do_not_contend() {
        let locks = ProjectLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let guard_a = locks.lock(a).await;
        // Locking a different project must not block.
        let guard_b = tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(b))
            .await
            .expect("locking a distinct project should not time out");
        drop(guard_a);
        drop(guard_b);
    }

    #[tokio::test]
    async fn same_project_serializes() {
        let locks = ProjectLocks::new();
        let project_id = Uuid::new_v4();

        let guard = locks.lock(project_id).await;
        let blocked = tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(project_id)).await;
        assert!(blocked.is_err());
        drop(guard);
    }
}
