//! Content rotation message handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

use super::handlers::error_reply;

pub async fn handle_next_content(
    state: &Arc<AppState>,
    session_id: String,
    game_type: String,
    content_type: String,
) -> Option<ServerMessage> {
    match state
        .next_content(&session_id, &game_type, &content_type)
        .await
    {
        Ok((item, progress)) => Some(ServerMessage::Content {
            session_id,
            item,
            progress,
        }),
        Err(e) => {
            tracing::warn!(
                session_id = %session_id,
                game_type = %game_type,
                content_type = %content_type,
                error = %e,
                "No content for request"
            );
            Some(error_reply(e))
        }
    }
}

pub async fn handle_confirm_shown(
    state: &Arc<AppState>,
    session_id: String,
    game_type: String,
    content_id: String,
) -> Option<ServerMessage> {
    match state
        .confirm_shown(&session_id, &game_type, &content_id)
        .await
    {
        Ok(Some(record)) => Some(ServerMessage::ContentRecorded {
            session_id,
            content_id,
            times_seen: record.times_seen,
        }),
        // History write failed and was logged; the game carries on
        Ok(None) => None,
        Err(e) => Some(error_reply(e)),
    }
}

pub async fn handle_seen_count(
    state: &Arc<AppState>,
    session_id: String,
    game_type: String,
    content_type: String,
) -> Option<ServerMessage> {
    match state
        .seen_count(&session_id, &game_type, &content_type)
        .await
    {
        Ok(seen) => Some(ServerMessage::SeenCount {
            session_id,
            game_type,
            content_type,
            seen,
        }),
        Err(e) => Some(error_reply(e)),
    }
}
