//! HTTP API endpoints.
//!
//! Read-only views used by kiosk displays and health checks; all commands go
//! through the WebSocket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::protocol::ServerMessage;
use crate::session::SessionError;
use crate::state::AppState;
use crate::types::{ClockStatus, SessionId};

/// Clock reading for one session
#[derive(Debug, Clone, Serialize)]
pub struct ClockView {
    pub session_id: SessionId,
    pub remaining_seconds: u64,
    pub status: ClockStatus,
    pub server_now: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub catalog_items: usize,
}

/// Routes under `/api`
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions/{session_id}/clock", get(get_clock))
        .route(
            "/api/sessions/{session_id}/progress/{game_type}/{content_type}",
            get(get_progress),
        )
}

fn error_response(e: SessionError) -> Response {
    let status = match e {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(ServerMessage::error(e.code(), e.to_string()))).into_response()
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.session_count().await,
        catalog_items: state.catalog.len(),
    })
}

/// Remaining time of a session.
///
/// GET /api/sessions/{session_id}/clock
pub async fn get_clock(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> Response {
    match state.get_session(&session_id).await {
        Ok(session) => {
            let (remaining_seconds, status) = session.clock().get_remaining();
            Json(ClockView {
                session_id,
                remaining_seconds,
                status,
                server_now: state.server_now(),
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Seen/total for the session's player over one content pool.
///
/// GET /api/sessions/{session_id}/progress/{game_type}/{content_type}
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((session_id, game_type, content_type)): Path<(SessionId, String, String)>,
) -> Response {
    match state.progress(&session_id, &game_type, &content_type).await {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => error_response(e),
    }
}
