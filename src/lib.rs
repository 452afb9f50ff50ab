pub mod cdn;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod resolver;
pub mod social;
pub mod state;
pub mod unfurl;

use axum::{
    routing::{any, get},
    Router,
};

use crate::state::AppState;

/// Build the application router.
///
/// - `GET /health` - liveness
/// - `ANY /api/og/get?url=` - link preview (non-GET answers 405)
///
/// Metrics, CORS and request tracing are layered on by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/og/get", any(handlers::link_preview::get_og_preview))
        .fallback(handlers::not_found)
        .with_state(state)
}
