//! Atomic `current` symlink rotation (spec.md §4.3 step 3): "create a temp
//! symlink `apps/<project_id>/.current_tmp_<nanos> → <extract_dir>`;
//! rename it over `current` (on POSIX, `mv -Tf` provides atomic replace on
//! the same filesystem). This guarantees no observer ever sees a missing
//! `current`."

use std::io;
use std::path::Path;

use crate::paths::{nanos_now, ProjectPaths};

pub async fn rotate_current(paths: &ProjectPaths, extract_dir: &Path) -> io::Result<()> {
    let temp = paths.temp_symlink(nanos_now());
    tokio::fs::symlink(extract_dir, &temp).await?;

    // `rename` over an existing symlink is POSIX-atomic as long as both
    // paths are on the same filesystem, matching `mv -Tf`'s guarantee.
    tokio::fs::rename(&temp, paths.current_symlink()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rotation_replaces_prior_symlink_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let apps_dir = dir.path().join("apps");
        tokio::fs::create_dir_all(&apps_dir).await.unwrap();
        let project_id = uuid::Uuid::new_v4();
        let paths = ProjectPaths::new(&apps_dir, project_id);
        tokio::fs::create_dir_all(paths.root()).await.unwrap();

        let first = paths.root().join("builds").join("a");
        let second = paths.root().join("builds").join("b");
        tokio::fs::create_dir_all(&first).await.unwrap();
        tokio::fs::create_dir_all(&second).await.unwrap();

        rotate_current(&paths, &first).await.unwrap();
        assert_eq!(
            tokio::fs::read_link(paths.current_symlink()).await.unwrap(),
            first
        );

        rotate_current(&paths, &second).await.unwrap();
        assert_eq!(
            tokio::fs::read_link(paths.current_symlink()).await.unwrap(),
            second
        );
    }
}
