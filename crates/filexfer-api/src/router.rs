//! Route definitions for the filexfer HTTP API.
//!
//! API routes are mounted under `/api`; static assets, when the configured
//! directory exists, under `/static`. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use std::path::Path;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload = body_limit(state.config.storage.max_upload_size_bytes);
    let max_chunk = body_limit(state.config.storage.max_chunk_size_bytes);

    let api_routes = Router::new()
        .merge(file_routes(max_chunk))
        .merge(simple_routes(max_upload))
        .merge(health_routes());

    let mut router = Router::new().nest("/api", api_routes);

    let static_dir = Path::new(&state.config.server.static_dir);
    if static_dir.is_dir() {
        router = router.nest_service("/static", ServeDir::new(static_dir));
    } else {
        tracing::debug!(dir = %static_dir.display(), "Static directory not found, /static disabled");
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors::build_cors_layer(&state.config.server.cors))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Listing, chunked upload, merge and range-aware download
fn file_routes(max_chunk: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/files",
            get(handlers::file::list_files)
                .post(handlers::file::upload_chunk)
                .layer(DefaultBodyLimit::max(max_chunk)),
        )
        .route("/files/merge", post(handlers::file::merge_file))
        .route("/files/{filename}", get(handlers::file::download_file))
}

/// Single-shot upload and forced download
fn simple_routes(max_upload: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/simple/upload",
            post(handlers::simple::simple_upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route(
            "/simple/download/{filename}",
            get(handlers::simple::simple_download),
        )
}

/// Health check endpoint
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

fn body_limit(bytes: u64) -> usize {
    usize::try_from(bytes).unwrap_or(usize::MAX)
}
