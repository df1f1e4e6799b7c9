//! Backend start-command resolution (spec.md §4.3 step 6): prefer an
//! explicit entry file from `package.json` in priority order, falling
//! back to a conventional filename scan.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

#[derive(Deserialize, Default)]
struct PackageJson {
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    scripts: PackageScripts,
}

#[derive(Deserialize, Default)]
struct PackageScripts {
    dev: Option<String>,
    start: Option<String>,
}

static ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:bun|node|tsx|ts-node|nodemon)\s+(?:run\s+)?(?:watch\s+)?(\S+\.(ts|js))").unwrap()
});

const FALLBACK_CANDIDATES: &[&str] = &[
    "src/index.ts",
    "src/index.js",
    "src/server.ts",
    "src/server.js",
    "index.ts",
    "index.js",
    "server.ts",
    "server.js",
    "src/app.ts",
    "src/app.js",
];

fn extract_entry_from_script(script: &str) -> Option<String> {
    ENTRY_RE
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn source_equivalent(main: &str) -> Option<String> {
    if !main.starts_with("dist/") {
        return None;
    }
    let swapped = main.replacen("dist/", "src/", 1);
    Some(swapped.replacen(".js", ".ts", 1))
}

fn read_package_json(project_dir: &Path) -> Option<PackageJson> {
    let raw = std::fs::read_to_string(project_dir.join("package.json")).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Returns the entry file path (relative to `project_dir`), if one could
/// be resolved, following the priority order: `scripts.dev` → `main` (if
/// it exists) → the TypeScript source-equivalent of a `dist/…` main →
/// `scripts.start` → a conventional filename scan.
pub fn resolve_backend_entry(project_dir: &Path) -> Option<String> {
    let package = read_package_json(project_dir).unwrap_or_default();

    if let Some(dev) = &package.scripts.dev {
        if let Some(entry) = extract_entry_from_script(dev) {
            return Some(entry);
        }
    }

    if let Some(main) = &package.main {
        if project_dir.join(main).exists() {
            return Some(main.clone());
        }
        if let Some(source) = source_equivalent(main) {
            if project_dir.join(&source).exists() {
                return Some(source);
            }
        }
    }

    if let Some(start) = &package.scripts.start {
        if let Some(entry) = extract_entry_from_script(start) {
            return Some(entry);
        }
    }

    FALLBACK_CANDIDATES
        .iter()
        .find(|candidate| project_dir.join(candidate).exists())
        .map(|candidate| candidate.to_string())
}

/// The actual shell command to launch: `bun run <entry>` if an entry was
/// resolved, else `bun run start`.
pub fn start_command(project_dir: &Path) -> String {
    match resolve_backend_entry(project_dir) {
        Some(entry) => format!("bun run {entry}"),
        None => "bun run start".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_package_json(dir: &Path, contents: &str) {
        fs::write(dir.join("package.json"), contents).unwrap();
    }

    #[test]
    fn prefers_dev_script_entry() {
        let dir = tempfile::tempdir().unwrap();
        write_package_json(
            dir.path(),
            r#"{"scripts": {"dev": "tsx watch src/main.ts", "start": "node dist/main.js"}}"#,
        );
        assert_eq!(
            resolve_backend_entry(dir.path()),
            Some("src/main.ts".to_string())
        );
    }

    #[test]
    fn falls_back_to_main_when_dev_script_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/main.js"), "").unwrap();
        write_package_json(dir.path(), r#"{"main": "dist/main.js"}"#);
        assert_eq!(
            resolve_backend_entry(dir.path()),
            Some("dist/main.js".to_string())
        );
    }

    #[test]
    fn falls_back_to_source_equivalent_when_main_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.ts"), "").unwrap();
        write_package_json(dir.path(), r#"{"main": "dist/main.js"}"#);
        assert_eq!(
            resolve_backend_entry(dir.path()),
            Some("src/main.ts".to_string())
        );
    }

    #[test]
    fn scans_conventional_filenames_when_package_json_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/server.ts"), "").unwrap();
        assert_eq!(
            resolve_backend_entry(dir.path()),
            Some("src/server.ts".to_string())
        );
    }

    #[test]
    fn defaults_to_bun_run_start_when_nothing_resolves() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(start_command(dir.path()), "bun run start");
    }
}
