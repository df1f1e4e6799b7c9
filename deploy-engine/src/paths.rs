//! Per-project filesystem layout (spec.md §4.3 "Per-project tree"):
//! `apps/<project_id>/{builds/<build_id>/, current→builds/<build_id>,
//! server.pid, current_build_id}`.

use std::path::{Path, PathBuf};

use uuid::Uuid;

pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(apps_dir: &Path, project_id: Uuid) -> Self {
        Self {
            root: apps_dir.join(project_id.to_string()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_dir(&self, build_id: Uuid) -> PathBuf {
        self.root.join("builds").join(build_id.to_string())
    }

    /// Extraction lands under `builds/<build_id>/extracted/` (Open
    /// Question (a) resolved to the newer layout — see DESIGN.md).
    pub fn extracted_dir(&self, build_id: Uuid) -> PathBuf {
        self.build_dir(build_id).join("extracted")
    }

    pub fn current_symlink(&self) -> PathBuf {
        self.root.join("current")
    }

    /// A temp symlink name unique enough to never collide across rotations.
    pub fn temp_symlink(&self, nanos: u128) -> PathBuf {
        self.root.join(format!(".current_tmp_{nanos}"))
    }

    pub fn server_pid_file(&self) -> PathBuf {
        self.root.join("server.pid")
    }

    pub fn current_build_id_file(&self) -> PathBuf {
        self.root.join("current_build_id")
    }
}

pub fn nanos_now() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos()
}
