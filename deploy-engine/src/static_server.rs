//! Static asset serving for frontend deployments (spec.md §4.3 step 5):
//! vite's `dist/` or Next.js's static-exported `out/`. Long-lived caching
//! for fingerprinted assets, no caching for everything else, and SPA
//! fallback to the root `index.html` on a miss.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

const IMMUTABLE_EXTENSIONS: &[&str] = &[
    "js", "css", "woff", "woff2", "ttf", "eot", "svg", "png", "jpg", "jpeg", "gif", "ico", "webp",
    "avif", "mp4", "webm",
];

#[derive(Clone)]
pub struct StaticServerState {
    root: PathBuf,
}

impl StaticServerState {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

pub fn router(state: StaticServerState) -> Router {
    Router::new().fallback(get(serve)).with_state(state)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

fn cache_control_for(path: &Path) -> &'static str {
    let is_immutable = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMMUTABLE_EXTENSIONS.contains(&ext))
        .unwrap_or(false);

    if is_immutable {
        "public, max-age=31536000, immutable"
    } else {
        "no-cache"
    }
}

async fn read_file(path: &Path) -> Option<Vec<u8>> {
    tokio::fs::read(path).await.ok()
}

fn respond(path: &Path, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type(path)),
            (header::CACHE_CONTROL, cache_control_for(path)),
        ],
        Body::from(bytes),
    )
        .into_response()
}

async fn serve(State(state): State<StaticServerState>, uri: Uri) -> Response {
    let requested = uri.path().trim_start_matches('/');
    if requested.split('/').any(|segment| segment == "..") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let mut candidate = state.root.join(requested);

    if candidate.is_dir() || requested.is_empty() {
        candidate = candidate.join("index.html");
    }

    if let Some(bytes) = read_file(&candidate).await {
        return respond(&candidate, bytes);
    }

    // SPA fallback: unknown routes resolve to the root index so client-side
    // routers can take over.
    let fallback = state.root.join("index.html");
    match read_file(&fallback).await {
        Some(bytes) => respond(&fallback, bytes),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprinted_assets_are_immutable() {
        assert_eq!(
            cache_control_for(Path::new("assets/app.a1b2.js")),
            "public, max-age=31536000, immutable"
        );
    }

    #[test]
    fn html_is_never_cached() {
        assert_eq!(cache_control_for(Path::new("index.html")), "no-cache");
    }

    #[tokio::test]
    async fn traversal_segments_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("index.html"), b"root").await.unwrap();
        let state = StaticServerState::new(dir.path().to_path_buf());
        let uri: Uri = "/../../etc/passwd".parse().unwrap();
        let response = serve(State(state), uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
