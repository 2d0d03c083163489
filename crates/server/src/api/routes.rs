use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{files, handlers, torrents};
use crate::state::AppState;

/// Upload cap for .torrent files.
const TORRENT_UPLOAD_LIMIT: usize = 2 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Everything touching records or the engine sits behind auth.
    let protected = Router::new()
        .route("/torrents", get(torrents::list_torrents))
        .route(
            "/torrents/file",
            post(torrents::add_from_file).layer(DefaultBodyLimit::max(TORRENT_UPLOAD_LIMIT)),
        )
        .route("/torrents/link", post(torrents::add_from_link))
        .route("/torrents/{id}", get(torrents::get_torrent))
        .route("/torrents/{id}", delete(torrents::remove_torrent))
        .route(
            "/torrents/{id}/files/{index}/token",
            get(torrents::file_token),
        )
        .route("/torrents/{id}/token", get(torrents::item_token))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            super::middleware::auth_middleware,
        ));

    // Operational endpoints and token resolution carry their own
    // credentials (or none).
    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        .route("/files/claims", get(files::resolve_claims));

    Router::new()
        .nest("/api/v1", protected.merge(public))
        .with_state(state)
        .layer(middleware::from_fn(super::middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
