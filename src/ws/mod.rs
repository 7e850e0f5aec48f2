mod clock;
mod content;
pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::SessionId;

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session to follow right away, e.g. after a page reload
    pub session: Option<SessionId>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(session = ?params.session, "WebSocket connection request");

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Sessions a connection receives broadcasts for
fn follow(watched: &mut HashSet<SessionId>, request: &ClientMessage, response: &ServerMessage) {
    match response {
        ServerMessage::Error { .. } => {}
        ServerMessage::SessionEnded { session_id } => {
            watched.remove(session_id);
        }
        _ => {
            if let Some(id) = response.session_id().or(request.session_id()) {
                watched.insert(id.to_string());
            }
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut watched: HashSet<SessionId> = params.session.into_iter().collect();

    // Send welcome message
    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        server_now: state.server_now(),
    };

    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    let mut broadcast_rx = state.broadcast.subscribe();

    loop {
        tokio::select! {
            // Forward clock broadcasts for the sessions this connection follows
            broadcast_msg = broadcast_rx.recv() => {
                if let Ok(msg) = broadcast_msg {
                    let relevant = msg
                        .session_id()
                        .is_some_and(|id| watched.contains(id));
                    if !relevant {
                        continue;
                    }
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let request = client_msg.clone();
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &state).await
                                {
                                    follow(&mut watched, &request, &response);
                                    if let Ok(json) = serde_json::to_string(&response) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            tracing::error!("Failed to send response");
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                );
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(sessions = ?watched, "WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_tracks_redeemed_and_ended_sessions() {
        let mut watched = HashSet::new();
        let redeem = ClientMessage::Redeem {
            player_id: "p1".to_string(),
            budget_seconds: 60,
        };
        let redeemed = ServerMessage::SessionRedeemed {
            session_id: "s1".to_string(),
            remaining_seconds: 60,
            status: crate::types::ClockStatus::Running,
        };
        follow(&mut watched, &redeem, &redeemed);
        assert!(watched.contains("s1"));

        let end = ClientMessage::End {
            session_id: "s1".to_string(),
        };
        follow(
            &mut watched,
            &end,
            &ServerMessage::SessionEnded {
                session_id: "s1".to_string(),
            },
        );
        assert!(watched.is_empty());
    }

    #[test]
    fn test_follow_ignores_errors() {
        let mut watched = HashSet::new();
        let resume = ClientMessage::Resume {
            session_id: "s1".to_string(),
            player_id: "p1".to_string(),
        };
        follow(
            &mut watched,
            &resume,
            &ServerMessage::error("NOT_FOUND", "Session not found: s1"),
        );
        assert!(watched.is_empty());
    }
}
