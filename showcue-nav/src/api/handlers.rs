//! Request handlers for the navigation API

use crate::api::server::AppContext;
use crate::error::NavError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use showcue_common::api::{CommandRequest, ErrorResponse, HealthResponse};
use tracing::debug;
use uuid::Uuid;

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "showcue-nav".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /sessions/:id/navigate
///
/// Applies a normalized navigation command. All input surfaces (keypad,
/// arrow keys, voice) land here with the same command vocabulary.
pub async fn navigate(
    State(ctx): State<AppContext>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CommandRequest>,
) -> Response {
    debug!("navigate: session={} command={:?}", session_id, req.command);
    match ctx.engine.apply(session_id, req.command).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /sessions/:id/navigation
///
/// Resync read: the persisted current state, initializing lazily on first
/// access. Reconnecting observers treat this as ground truth over any
/// previously received broadcast.
pub async fn get_navigation(
    State(ctx): State<AppContext>,
    Path(session_id): Path<Uuid>,
) -> Response {
    match ctx.engine.current(session_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Map a NavError to an HTTP response
fn error_response(err: NavError) -> Response {
    let (status, code) = match &err {
        NavError::InvalidPosition { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_position"),
        NavError::NoLineup(_) => (StatusCode::UNPROCESSABLE_ENTITY, "no_lineup"),
        NavError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
        NavError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    let body = ErrorResponse {
        error: code.to_string(),
        message: err.to_string(),
    };
    (status, Json(body)).into_response()
}
