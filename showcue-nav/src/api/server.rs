//! HTTP server setup and routing
//!
//! Sets up the Axum router with the navigation command endpoint, resync
//! reads, and the per-session SSE stream.

use crate::engine::NavigationEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<NavigationEngine>,
}

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Navigation authority
        .route("/sessions/:id/navigate", post(super::handlers::navigate))
        .route("/sessions/:id/navigation", get(super::handlers::get_navigation))
        // SSE event stream (subscription doubles as resync)
        .route("/sessions/:id/events", get(super::sse::event_stream))
        .with_state(ctx)
        // Local-network clients (host display, mobile controller)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
