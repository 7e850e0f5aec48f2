//! Session and clock message handlers

use crate::protocol::ServerMessage;
use crate::session::PlaySession;
use crate::state::AppState;
use std::sync::Arc;

use super::handlers::error_reply;

/// Current clock reading for a session
fn clock_update(state: &AppState, session: &PlaySession) -> ServerMessage {
    let (remaining_seconds, status) = session.clock().get_remaining();
    ServerMessage::ClockUpdate {
        session_id: session.id.clone(),
        remaining_seconds,
        status,
        server_now: state.server_now(),
    }
}

pub async fn handle_redeem(
    state: &Arc<AppState>,
    player_id: String,
    budget_seconds: i64,
) -> Option<ServerMessage> {
    tracing::info!(player_id = %player_id, budget_seconds, "Redeem request");
    match state.redeem_session(&player_id, budget_seconds).await {
        Ok(session) => {
            let (remaining_seconds, status) = session.clock().get_remaining();
            Some(ServerMessage::SessionRedeemed {
                session_id: session.id.clone(),
                remaining_seconds,
                status,
            })
        }
        Err(e) => {
            tracing::warn!(player_id = %player_id, error = %e, "Redeem failed");
            Some(error_reply(e))
        }
    }
}

pub async fn handle_resume(
    state: &Arc<AppState>,
    session_id: String,
    player_id: String,
) -> Option<ServerMessage> {
    match state.restore_session(&session_id, &player_id).await {
        Ok(session) => Some(clock_update(state, &session)),
        Err(e) => Some(error_reply(e)),
    }
}

pub async fn handle_end(state: &Arc<AppState>, session_id: String) -> Option<ServerMessage> {
    match state.end_session(&session_id).await {
        Ok(()) => Some(ServerMessage::SessionEnded { session_id }),
        Err(e) => Some(error_reply(e)),
    }
}

pub async fn handle_start(state: &Arc<AppState>, session_id: String) -> Option<ServerMessage> {
    let session = match state.get_session(&session_id).await {
        Ok(s) => s,
        Err(e) => return Some(error_reply(e)),
    };

    if !session.clock().start().await {
        tracing::debug!(session_id = %session_id, "Start ignored");
    }
    Some(clock_update(state, &session))
}

pub async fn handle_pause(state: &Arc<AppState>, session_id: String) -> Option<ServerMessage> {
    let session = match state.get_session(&session_id).await {
        Ok(s) => s,
        Err(e) => return Some(error_reply(e)),
    };

    if !session.clock().pause().await {
        tracing::debug!(session_id = %session_id, "Pause ignored");
    }
    Some(clock_update(state, &session))
}

pub async fn handle_reset(
    state: &Arc<AppState>,
    session_id: String,
    budget_seconds: Option<i64>,
) -> Option<ServerMessage> {
    let session = match state.get_session(&session_id).await {
        Ok(s) => s,
        Err(e) => return Some(error_reply(e)),
    };

    match session.clock().reset(budget_seconds).await {
        Ok(()) => Some(clock_update(state, &session)),
        Err(e) => Some(error_reply(e.into())),
    }
}

pub async fn handle_get_remaining(
    state: &Arc<AppState>,
    session_id: String,
) -> Option<ServerMessage> {
    match state.get_session(&session_id).await {
        Ok(session) => Some(clock_update(state, &session)),
        Err(e) => Some(error_reply(e)),
    }
}

pub async fn handle_visibility(
    state: &Arc<AppState>,
    session_id: String,
    hidden: bool,
) -> Option<ServerMessage> {
    let session = match state.get_session(&session_id).await {
        Ok(s) => s,
        Err(e) => return Some(error_reply(e)),
    };

    let changed = if hidden {
        session.on_background().await
    } else {
        session.on_foreground().await
    };
    tracing::debug!(
        session_id = %session_id,
        hidden,
        policy = ?session.visibility(),
        changed,
        "Visibility changed"
    );
    Some(clock_update(state, &session))
}
