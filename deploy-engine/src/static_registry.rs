//! Tracks in-process static file servers (spec.md §4.3 step 5 "static
//! server" path). These run as axum servers inside Deploy Engine's own
//! process rather than as spawned child processes, so there is no OS pid
//! for `server.pid` to name; this registry's shutdown channel is Deploy
//! Engine's equivalent of "send SIGTERM" for that path (see DESIGN.md).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct StaticServerRegistry {
    handles: Arc<Mutex<HashMap<Uuid, oneshot::Sender<()>>>>,
}

impl StaticServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new running static server for `project_id`, shutting
    /// down (and dropping) any previous one for the same project first.
    pub fn register(&self, project_id: Uuid, shutdown: oneshot::Sender<()>) {
        let mut handles = self.handles.lock().expect("static server registry poisoned");
        if let Some(previous) = handles.insert(project_id, shutdown) {
            let _ = previous.send(());
        }
    }

    /// Stops the static server for `project_id`, if one is registered.
    /// Returns whether one was found.
    pub fn stop(&self, project_id: Uuid) -> bool {
        let mut handles = self.handles.lock().expect("static server registry poisoned");
        match handles.remove(&project_id) {
            Some(shutdown) => {
                let _ = shutdown.send(());
                true
            }
            None => false,
        }
    }
}
