//! WebSocket message dispatch
//!
//! Entry point for client messages. Clock and session lifecycle commands go to
//! [`clock`], content rotation commands to [`content`].

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::SessionError;
use crate::state::AppState;
use std::sync::Arc;

use super::{clock, content};

/// Turn a session error into the wire error message
pub(crate) fn error_reply(e: SessionError) -> ServerMessage {
    ServerMessage::error(e.code(), e.to_string())
}

/// Handle client messages and return optional response
pub async fn handle_message(msg: ClientMessage, state: &Arc<AppState>) -> Option<ServerMessage> {
    match msg {
        // Session lifecycle
        ClientMessage::Redeem {
            player_id,
            budget_seconds,
        } => clock::handle_redeem(state, player_id, budget_seconds).await,

        ClientMessage::Resume {
            session_id,
            player_id,
        } => clock::handle_resume(state, session_id, player_id).await,

        ClientMessage::End { session_id } => clock::handle_end(state, session_id).await,

        // Clock commands
        ClientMessage::Start { session_id } => clock::handle_start(state, session_id).await,

        ClientMessage::Pause { session_id } => clock::handle_pause(state, session_id).await,

        ClientMessage::Reset {
            session_id,
            budget_seconds,
        } => clock::handle_reset(state, session_id, budget_seconds).await,

        ClientMessage::GetRemaining { session_id } => {
            clock::handle_get_remaining(state, session_id).await
        }

        ClientMessage::Visibility { session_id, hidden } => {
            clock::handle_visibility(state, session_id, hidden).await
        }

        // Content rotation
        ClientMessage::NextContent {
            session_id,
            game_type,
            content_type,
        } => content::handle_next_content(state, session_id, game_type, content_type).await,

        ClientMessage::ConfirmShown {
            session_id,
            game_type,
            content_id,
        } => content::handle_confirm_shown(state, session_id, game_type, content_id).await,

        ClientMessage::SeenCount {
            session_id,
            game_type,
            content_type,
        } => content::handle_seen_count(state, session_id, game_type, content_type).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClockStatus;

    async fn redeem(state: &Arc<AppState>, budget_seconds: i64) -> String {
        match handle_message(
            ClientMessage::Redeem {
                player_id: "p1".to_string(),
                budget_seconds,
            },
            state,
        )
        .await
        {
            Some(ServerMessage::SessionRedeemed { session_id, .. }) => session_id,
            other => panic!("Expected SessionRedeemed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redeem_replies_with_running_clock() {
        let state = Arc::new(AppState::in_memory());

        let result = handle_message(
            ClientMessage::Redeem {
                player_id: "p1".to_string(),
                budget_seconds: 900,
            },
            &state,
        )
        .await;

        if let Some(ServerMessage::SessionRedeemed {
            remaining_seconds,
            status,
            ..
        }) = result
        {
            assert_eq!(remaining_seconds, 900);
            assert_eq!(status, ClockStatus::Running);
        } else {
            panic!("Expected SessionRedeemed message");
        }
    }

    #[tokio::test]
    async fn test_invalid_budget() {
        let state = Arc::new(AppState::in_memory());

        let result = handle_message(
            ClientMessage::Redeem {
                player_id: "p1".to_string(),
                budget_seconds: -5,
            },
            &state,
        )
        .await;

        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "INVALID_BUDGET");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_pause_and_start() {
        let state = Arc::new(AppState::in_memory());
        let session_id = redeem(&state, 60).await;

        let result = handle_message(
            ClientMessage::Pause {
                session_id: session_id.clone(),
            },
            &state,
        )
        .await;
        assert!(matches!(
            result,
            Some(ServerMessage::ClockUpdate {
                status: ClockStatus::Paused,
                ..
            })
        ));

        let result = handle_message(ClientMessage::Start { session_id }, &state).await;
        assert!(matches!(
            result,
            Some(ServerMessage::ClockUpdate {
                status: ClockStatus::Running,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let state = Arc::new(AppState::in_memory());

        let result = handle_message(
            ClientMessage::GetRemaining {
                session_id: "missing".to_string(),
            },
            &state,
        )
        .await;

        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "NOT_FOUND");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_hidden_page_pauses_clock() {
        let state = Arc::new(AppState::in_memory());
        let session_id = redeem(&state, 60).await;

        let result = handle_message(
            ClientMessage::Visibility {
                session_id: session_id.clone(),
                hidden: true,
            },
            &state,
        )
        .await;
        assert!(matches!(
            result,
            Some(ServerMessage::ClockUpdate {
                status: ClockStatus::Paused,
                ..
            })
        ));

        let result = handle_message(
            ClientMessage::Visibility {
                session_id,
                hidden: false,
            },
            &state,
        )
        .await;
        assert!(matches!(
            result,
            Some(ServerMessage::ClockUpdate {
                status: ClockStatus::Running,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_reset_with_new_budget() {
        let state = Arc::new(AppState::in_memory());
        let session_id = redeem(&state, 60).await;

        let result = handle_message(
            ClientMessage::Reset {
                session_id,
                budget_seconds: Some(300),
            },
            &state,
        )
        .await;

        if let Some(ServerMessage::ClockUpdate {
            remaining_seconds,
            status,
            ..
        }) = result
        {
            assert_eq!(remaining_seconds, 300);
            assert_eq!(status, ClockStatus::Idle);
        } else {
            panic!("Expected ClockUpdate message");
        }
    }

    #[tokio::test]
    async fn test_confirm_unknown_content() {
        let state = Arc::new(AppState::in_memory());
        let session_id = redeem(&state, 60).await;

        let result = handle_message(
            ClientMessage::ConfirmShown {
                session_id,
                game_type: "trivia".to_string(),
                content_id: "nope".to_string(),
            },
            &state,
        )
        .await;

        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "UNKNOWN_CONTENT");
        } else {
            panic!("Expected Error message");
        }
    }
}
