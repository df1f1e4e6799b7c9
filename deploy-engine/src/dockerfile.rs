//! Dockerfile sanitization/generation (spec.md §4.3 "Container mode"):
//! "If a `Dockerfile` exists, sanitize it ... If no Dockerfile exists,
//! generate one per framework."

use std::path::Path;

use once_cell::sync::Lazy;
use paas_core::types::Framework;
use regex::Regex;

static EXPOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*EXPOSE\s+\d+.*$").unwrap());
static ENV_PORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*ENV\s+PORT\s*=?.*$").unwrap());
static USER_ROOT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?mi)^\s*USER\s+root\s*$").unwrap());
static PRIVILEGED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"--privileged").unwrap());
static DOCKER_SOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/var/run/docker\.sock").unwrap());

/// Rewrites a user-supplied Dockerfile so it exposes and listens on the
/// project's assigned port, and neutralizes a short list of dangerous
/// directives by prefixing them with a comment rather than deleting them
/// outright (keeps the file readable for debugging).
pub fn sanitize(dockerfile: &str, port: u16) -> String {
    let mut out = EXPOSE_RE
        .replace_all(dockerfile, format!("EXPOSE {port}"))
        .into_owned();

    if ENV_PORT_RE.is_match(&out) {
        out = ENV_PORT_RE
            .replace_all(&out, format!("ENV PORT={port}"))
            .into_owned();
    } else {
        out.push_str(&format!("\nENV PORT={port}\n"));
    }

    out = USER_ROOT_RE.replace_all(&out, "# USER root (neutralized)").into_owned();
    out = PRIVILEGED_RE.replace_all(&out, "# --privileged (neutralized)").into_owned();
    out = DOCKER_SOCK_RE
        .replace_all(&out, "# /var/run/docker.sock (neutralized)")
        .into_owned();

    out
}

/// The internal port the generated Dockerfile's application listens on:
/// 80 for an nginx-served vite build, 3000 for everything else.
pub fn internal_port(framework: Framework) -> u16 {
    match framework {
        Framework::Vite => 80,
        Framework::Nextjs | Framework::Express | Framework::Hono | Framework::Elysia => 3000,
    }
}

fn generate_vite() -> String {
    "FROM nginx:alpine\nCOPY dist /usr/share/nginx/html\nEXPOSE 80\n".to_string()
}

fn generate_node(start_command: &str) -> String {
    format!(
        "FROM oven/bun:alpine AS build\nWORKDIR /app\nCOPY . .\nRUN bun install\n\n\
         FROM oven/bun:alpine\nWORKDIR /app\nCOPY --from=build /app .\n\
         ENV NODE_ENV=production\nENV PORT=3000\nEXPOSE 3000\nCMD {start_command}\n"
    )
}

pub fn generate(framework: Framework, start_command: &str) -> String {
    match framework {
        Framework::Vite => generate_vite(),
        Framework::Nextjs => generate_node("[\"bun\", \"run\", \"start\"]"),
        Framework::Express | Framework::Hono | Framework::Elysia => {
            generate_node(&format!("[\"sh\", \"-c\", \"{start_command}\"]"))
        }
    }
}

pub fn dockerfile_path(extract_dir: &Path) -> std::path::PathBuf {
    extract_dir.join("Dockerfile")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rewrites_expose_and_injects_port() {
        let input = "FROM node:20\nEXPOSE 8080\n";
        let out = sanitize(input, 9001);
        assert!(out.contains("EXPOSE 9001"));
        assert!(out.contains("ENV PORT=9001"));
    }

    #[test]
    fn sanitize_neutralizes_dangerous_directives() {
        let input = "FROM node:20\nUSER root\nRUN mount --privileged\nVOLUME /var/run/docker.sock\n";
        let out = sanitize(input, 9001);
        assert!(out.contains("# USER root (neutralized)"));
        assert!(out.contains("(neutralized)"));
        assert!(!out.contains("USER root\n"));
    }

    #[test]
    fn generated_vite_dockerfile_serves_dist_on_80() {
        let out = generate(Framework::Vite, "");
        assert!(out.contains("EXPOSE 80"));
        assert_eq!(internal_port(Framework::Vite), 80);
    }

    #[test]
    fn generated_backend_dockerfile_uses_port_3000() {
        assert_eq!(internal_port(Framework::Express), 3000);
    }
}
