//! Backend build-step gating (spec.md §4.2 step 5): a backend framework
//! only runs install+build when its `build_command` names a compilation
//! tool *and* `package.json` actually declares a `scripts.build` entry.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

const COMPILATION_TOOLS: &[&str] = &[
    "tsc", "esbuild", "swc", "rollup", "webpack", "parcel", "vite build", "next build", "tsup",
    "unbuild", "ncc",
];

static RUN_BUILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:npm|bun|yarn|pnpm)\s+run\s+build").unwrap());

#[derive(Debug, Deserialize, Default)]
struct PackageJson {
    #[serde(default)]
    scripts: PackageScripts,
}

#[derive(Debug, Deserialize, Default)]
struct PackageScripts {
    build: Option<String>,
}

/// True if `build_command` references a known compilation tool, directly
/// or via a `(npm|bun|yarn|pnpm) run build` invocation.
fn mentions_compilation_tool(build_command: &str) -> bool {
    COMPILATION_TOOLS.iter().any(|tool| build_command.contains(tool)) || RUN_BUILD_RE.is_match(build_command)
}

/// Reads `project_dir/package.json` and decides whether a backend
/// project's build step should run at all (spec.md §4.2 step 5: "Otherwise
/// skip both — ship source as-is"). A missing or unparsable
/// `package.json` is treated as "no build script", matching the
/// conservative default of shipping source unmodified.
pub fn backend_needs_build(project_dir: &Path, build_command: &str) -> bool {
    if !mentions_compilation_tool(build_command) {
        return false;
    }

    let Ok(raw) = std::fs::read_to_string(project_dir.join("package.json")) else {
        return false;
    };
    let Ok(package) = serde_json::from_str::<PackageJson>(&raw) else {
        return false;
    };

    package.scripts.build.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_compilation_tools() {
        assert!(mentions_compilation_tool("tsc -p ."));
        assert!(mentions_compilation_tool("esbuild src/index.ts"));
        assert!(mentions_compilation_tool("npm run build"));
        assert!(!mentions_compilation_tool("echo hello"));
    }

    #[test]
    fn requires_both_tool_mention_and_build_script() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"build": "tsc"}}"#,
        )
        .unwrap();

        assert!(backend_needs_build(dir.path(), "npm run build"));
        assert!(!backend_needs_build(dir.path(), "echo hello"));
    }

    #[test]
    fn missing_build_script_skips_build_even_with_tool_mention() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"scripts": {}}"#).unwrap();
        assert!(!backend_needs_build(dir.path(), "tsc -p ."));
    }

    #[test]
    fn missing_package_json_skips_build() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!backend_needs_build(dir.path(), "tsc -p ."));
    }
}
