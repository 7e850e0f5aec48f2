use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a paid session after the ticket/card was redeemed
    Redeem {
        player_id: PlayerId,
        budget_seconds: i64,
    },
    /// Reattach to a session after a reload
    Resume {
        session_id: SessionId,
        player_id: PlayerId,
    },
    Start {
        session_id: SessionId,
    },
    Pause {
        session_id: SessionId,
    },
    Reset {
        session_id: SessionId,
        budget_seconds: Option<i64>,
    },
    GetRemaining {
        session_id: SessionId,
    },
    /// Page visibility changed on the client
    Visibility {
        session_id: SessionId,
        hidden: bool,
    },
    NextContent {
        session_id: SessionId,
        game_type: GameTypeId,
        content_type: ContentType,
    },
    /// The client committed a content item to the screen
    ConfirmShown {
        session_id: SessionId,
        game_type: GameTypeId,
        content_id: ContentId,
    },
    SeenCount {
        session_id: SessionId,
        game_type: GameTypeId,
        content_type: ContentType,
    },
    End {
        session_id: SessionId,
    },
}

impl ClientMessage {
    /// Session this message refers to, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ClientMessage::Redeem { .. } => None,
            ClientMessage::Resume { session_id, .. }
            | ClientMessage::Start { session_id }
            | ClientMessage::Pause { session_id }
            | ClientMessage::Reset { session_id, .. }
            | ClientMessage::GetRemaining { session_id }
            | ClientMessage::Visibility { session_id, .. }
            | ClientMessage::NextContent { session_id, .. }
            | ClientMessage::ConfirmShown { session_id, .. }
            | ClientMessage::SeenCount { session_id, .. }
            | ClientMessage::End { session_id } => Some(session_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
    },
    SessionRedeemed {
        session_id: SessionId,
        remaining_seconds: u64,
        status: ClockStatus,
    },
    /// Pushed on every clock change and in reply to clock commands
    ClockUpdate {
        session_id: SessionId,
        remaining_seconds: u64,
        status: ClockStatus,
        server_now: String,
    },
    /// Sent once when the budget runs out; clients must leave the game screen
    SessionExpired {
        session_id: SessionId,
    },
    Content {
        session_id: SessionId,
        item: ContentItem,
        progress: Progress,
    },
    ContentRecorded {
        session_id: SessionId,
        content_id: ContentId,
        times_seen: u32,
    },
    SeenCount {
        session_id: SessionId,
        game_type: GameTypeId,
        content_type: ContentType,
        seen: usize,
    },
    SessionEnded {
        session_id: SessionId,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    /// Session this message belongs to, used to route broadcasts
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ServerMessage::Welcome { .. } | ServerMessage::Error { .. } => None,
            ServerMessage::SessionRedeemed { session_id, .. }
            | ServerMessage::ClockUpdate { session_id, .. }
            | ServerMessage::SessionExpired { session_id }
            | ServerMessage::Content { session_id, .. }
            | ServerMessage::ContentRecorded { session_id, .. }
            | ServerMessage::SeenCount { session_id, .. }
            | ServerMessage::SessionEnded { session_id } => Some(session_id),
        }
    }

    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}
