//! Artifact packaging (spec.md §6 "Artifact format"): a gzipped tar built
//! from a subset of the project's build output, grounded in the spec's
//! per-framework allow-lists.
//!
//! The spec's wording is internally ambiguous for backend frameworks: one
//! sentence says "include every top-level entry except `node_modules/`
//! and `.git/`" (a deny-list), while a later sentence enumerates an
//! explicit backend allow-list. This implementation follows the deny-list
//! reading — it is the less surprising default for frameworks that ship
//! arbitrary source layouts, and is recorded as an Open Question
//! resolution in `DESIGN.md`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use paas_core::types::Framework;

const BACKEND_DENYLIST: &[&str] = &["node_modules", ".git"];

/// Top-level entries kept for each frontend framework, matched against the
/// entry's file name (glob-style `*` suffix supported for `next.config.*`).
fn frontend_allowlist(framework: Framework) -> &'static [&'static str] {
    match framework {
        Framework::Nextjs => &[".next", "public", "package.json", "bun.lockb", "next.config.*", "out"],
        Framework::Vite => &["dist"],
        Framework::Express | Framework::Hono | Framework::Elysia => &[],
    }
}

fn matches_allowlist_entry(name: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    }
}

/// Decides whether a top-level directory entry should be included in the
/// artifact tar for the given framework and optional resolved backend
/// entry file (kept alongside its parent directory even if the directory
/// itself is not separately allow-listed).
fn keep_entry(name: &str, framework: Framework, entry_parent: Option<&str>) -> bool {
    if framework.is_frontend() {
        return frontend_allowlist(framework)
            .iter()
            .any(|pattern| matches_allowlist_entry(name, pattern));
    }

    if BACKEND_DENYLIST.contains(&name) {
        return false;
    }
    if let Some(parent) = entry_parent {
        if name == parent {
            return true;
        }
    }
    true
}

/// Packages `root` into a gzipped tar following the artifact format rules,
/// returning the compressed bytes in memory (Build Worker streams these
/// directly to Deploy Engine's `/artifacts/upload`).
pub fn package_artifact(
    root: &Path,
    framework: Framework,
    entry_parent: Option<&str>,
) -> io::Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !keep_entry(&name, framework, entry_parent) {
            continue;
        }

        let path = entry.path();
        if path.is_dir() {
            builder.append_dir_all(&name, &path)?;
        } else {
            builder.append_path_with_name(&path, &name)?;
        }
    }

    let encoder = builder.into_inner()?;
    encoder.finish()
}

/// Extracts a gzipped tar into `destination`, used by Deploy Engine during
/// activation (spec.md §4.3 step 2).
pub fn extract_artifact(tar_gz: &[u8], destination: &Path) -> io::Result<()> {
    fs::create_dir_all(destination)?;
    let decoder = flate2::read::GzDecoder::new(tar_gz);
    let mut archive = tar::Archive::new(decoder);
    archive.unpack(destination)
}

/// Locates the conventional artifact path for a build, per spec.md §3
/// "Artifact": `<artifacts_dir>/<build_id>.tar.gz`.
pub fn artifact_path(artifacts_dir: &Path, build_id: uuid::Uuid) -> PathBuf {
    artifacts_dir.join(format!("{build_id}.tar.gz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_allowlist_matches_glob_suffix() {
        assert!(matches_allowlist_entry("next.config.js", "next.config.*"));
        assert!(matches_allowlist_entry("next.config.mjs", "next.config.*"));
        assert!(!matches_allowlist_entry("nextauth.config.js", "next.config.*"));
    }

    #[test]
    fn backend_denylist_excludes_node_modules_and_git() {
        assert!(!keep_entry("node_modules", Framework::Express, None));
        assert!(!keep_entry(".git", Framework::Hono, None));
        assert!(keep_entry("src", Framework::Express, None));
    }

    #[test]
    fn frontend_allowlist_excludes_unlisted_entries() {
        assert!(keep_entry("dist", Framework::Vite, None));
        assert!(!keep_entry("src", Framework::Vite, None));
        assert!(keep_entry(".next", Framework::Nextjs, None));
        assert!(!keep_entry("node_modules", Framework::Nextjs, None));
    }

    #[test]
    fn package_and_extract_round_trip() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("package.json"), "{}").unwrap();
        fs::create_dir(src.path().join("dist")).unwrap();
        fs::write(src.path().join("dist/index.html"), "<html></html>").unwrap();
        fs::create_dir(src.path().join("node_modules")).unwrap();
        fs::write(src.path().join("node_modules/leftpad.js"), "x").unwrap();

        let tar_gz = package_artifact(src.path(), Framework::Vite, None).unwrap();

        let dest = tempfile::tempdir().unwrap();
        extract_artifact(&tar_gz, dest.path()).unwrap();

        assert!(dest.path().join("dist/index.html").exists());
        assert!(!dest.path().join("node_modules").exists());
        assert!(!dest.path().join("package.json").exists());
    }
}
