//! Package-manager command rewrite (spec.md §4.2 "Package-manager
//! rewrite"): every `&&`-separated segment of a build command is rewritten
//! to use `bun` in place of npm/yarn/pnpm, idempotently.

/// Rewrites a single `&&`-separated segment. Install-family commands
/// become `bun install`; `run`-family commands become `bun run <script>`
/// unless the script itself is `add`, `remove`, or `install` (those stay
/// untouched — they are package-manager operations, not build scripts).
fn rewrite_segment(segment: &str) -> String {
    let trimmed = segment.trim();

    let is_install = matches!(
        trimmed,
        "npm install"
            | "npm i"
            | "npm ci"
            | "yarn install"
            | "yarn"
            | "pnpm install"
            | "pnpm i"
    );
    if is_install {
        return "bun install".to_string();
    }

    for prefix in ["npm run ", "pnpm run ", "yarn "] {
        if let Some(script) = trimmed.strip_prefix(prefix) {
            let script = script.trim();
            if !matches!(script, "add" | "remove" | "install") {
                return format!("bun run {script}");
            }
        }
    }

    segment.to_string()
}

/// Rewrites every `&&`-separated segment of `command`. Idempotent:
/// `rewrite(rewrite(x)) == rewrite(x)` (spec.md §8), since a segment that
/// is already `bun ...` matches none of the rewrite patterns above and
/// passes through unchanged.
pub fn rewrite_package_manager(command: &str) -> String {
    command
        .split("&&")
        .map(rewrite_segment)
        .collect::<Vec<_>>()
        .join(" && ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_install_variants() {
        for (input, expected) in [
            ("npm install", "bun install"),
            ("npm i", "bun install"),
            ("npm ci", "bun install"),
            ("yarn install", "bun install"),
            ("yarn", "bun install"),
            ("pnpm install", "bun install"),
            ("pnpm i", "bun install"),
        ] {
            assert_eq!(rewrite_package_manager(input), expected);
        }
    }

    #[test]
    fn rewrites_run_variants_but_not_package_manager_subcommands() {
        assert_eq!(rewrite_package_manager("npm run build"), "bun run build");
        assert_eq!(rewrite_package_manager("pnpm run build"), "bun run build");
        assert_eq!(rewrite_package_manager("yarn build"), "bun run build");
        assert_eq!(rewrite_package_manager("yarn add left-pad"), "yarn add left-pad");
        assert_eq!(rewrite_package_manager("yarn remove left-pad"), "yarn remove left-pad");
    }

    #[test]
    fn rewrites_each_segment_of_a_compound_command() {
        assert_eq!(
            rewrite_package_manager("npm install && npm run build"),
            "bun install && bun run build"
        );
    }

    #[test]
    fn passes_through_unrelated_segments() {
        assert_eq!(rewrite_package_manager("echo hello"), "echo hello");
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "npm install && npm run build",
            "yarn && yarn build",
            "bun install && bun run build",
            "echo hello",
        ];
        for input in inputs {
            let once = rewrite_package_manager(input);
            let twice = rewrite_package_manager(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }
}
