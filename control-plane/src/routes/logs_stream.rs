//! Live build log streaming over WebSocket (spec.md §6: "subscribe by
//! build id; server emits `{buildId, data, level}` messages"). Grounded
//! in `temps-deployments`'s WebSocket log-tailing handlers.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Serialize)]
struct LiveLogMessage {
    build_id: Uuid,
    data: String,
    level: paas_core::LogLevel,
}

async fn stream_build_logs(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(build_id): Path<Uuid>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, build_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, build_id: Uuid) {
    let mut rx = state.log_hub.subscribe(build_id);

    loop {
        match rx.recv().await {
            Ok(entry) => {
                let payload = LiveLogMessage {
                    build_id: entry.build_id,
                    data: entry.message,
                    level: entry.level,
                };
                let Ok(text) = serde_json::to_string(&payload) else {
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(%build_id, skipped, "log stream subscriber lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }

    let _ = socket.close().await;
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/builds/{id}/logs/stream", get(stream_build_logs))
}
