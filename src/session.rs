//! Play session composition
//!
//! A [`PlaySession`] is what a game screen holds: the session's clock, the
//! shared content selector and the visibility policy. The clock and the
//! selector never talk to each other; only this type combines them.

use std::sync::Arc;

use crate::clock::{ClockError, SessionClock, Subscription};
use crate::rotation::{ContentSelector, SelectorError};
use crate::types::*;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session has expired")]
    Expired,

    #[error("Unknown content: {0}")]
    UnknownContent(ContentId),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

impl SessionError {
    /// Stable code for wire errors
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => "NOT_FOUND",
            SessionError::Expired => "SESSION_EXPIRED",
            SessionError::UnknownContent(_) => "UNKNOWN_CONTENT",
            SessionError::Clock(ClockError::InvalidBudget(_)) => "INVALID_BUDGET",
            SessionError::Clock(ClockError::Persistence(_)) => "PERSISTENCE_FAILURE",
            SessionError::Selector(SelectorError::EmptyPool { .. }) => "EMPTY_POOL",
        }
    }
}

pub struct PlaySession {
    pub id: SessionId,
    pub player_id: PlayerId,
    clock: Arc<SessionClock>,
    selector: Arc<ContentSelector>,
    visibility: VisibilityPolicy,
    /// Observers that live as long as the session
    subscriptions: std::sync::Mutex<Vec<Subscription>>,
}

impl PlaySession {
    pub fn new(
        player_id: impl Into<PlayerId>,
        clock: Arc<SessionClock>,
        selector: Arc<ContentSelector>,
        visibility: VisibilityPolicy,
    ) -> Self {
        Self {
            id: clock.session_id().to_string(),
            player_id: player_id.into(),
            clock,
            selector,
            visibility,
            subscriptions: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn clock(&self) -> &Arc<SessionClock> {
        &self.clock
    }

    pub fn visibility(&self) -> VisibilityPolicy {
        self.visibility
    }

    /// Keep an observer registered for the lifetime of this session
    pub fn hold(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .push(subscription);
    }

    pub fn is_expired(&self) -> bool {
        self.clock.get_remaining().1 == ClockStatus::Expired
    }

    /// The hosting page was hidden
    pub async fn on_background(&self) -> bool {
        match self.visibility {
            VisibilityPolicy::PauseWhenHidden => self.clock.pause().await,
            VisibilityPolicy::BurnWhenHidden => false,
        }
    }

    /// The hosting page became visible again
    pub async fn on_foreground(&self) -> bool {
        match self.visibility {
            VisibilityPolicy::PauseWhenHidden => self.clock.start().await,
            VisibilityPolicy::BurnWhenHidden => false,
        }
    }

    /// Next content item for a game screen, refused once the session expired
    pub async fn next_content(
        &self,
        game_type: &str,
        content_type: &str,
        pool: &[ContentItem],
    ) -> SessionResult<ContentItem> {
        if self.is_expired() {
            return Err(SessionError::Expired);
        }

        Ok(self
            .selector
            .pick_unseen(&self.player_id, game_type, content_type, pool)
            .await?)
    }

    /// Mark an item as shown. Only call once it is committed to display.
    pub async fn confirm_shown(&self, item: &ContentItem) -> Option<ContentRecord> {
        self.selector
            .record_seen(&self.player_id, &item.game_type, &item.id, &item.content_type)
            .await
    }

    pub async fn seen_count(&self, game_type: &str, content_type: &str) -> usize {
        self.selector
            .get_seen_count(&self.player_id, game_type, content_type)
            .await
    }

    pub async fn progress(
        &self,
        game_type: &str,
        content_type: &str,
        pool: &[ContentItem],
    ) -> Progress {
        self.selector
            .progress(&self.player_id, game_type, content_type, pool)
            .await
    }
}
