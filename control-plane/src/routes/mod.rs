pub mod builds;
pub mod deploy;
pub mod domains;
pub mod github;
pub mod health;
pub mod internal;
pub mod logs_stream;
pub mod projects;

use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(projects::routes())
        .merge(builds::routes())
        .merge(deploy::routes())
        .merge(domains::routes())
        .merge(github::routes())
        .merge(internal::routes())
        .merge(logs_stream::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
