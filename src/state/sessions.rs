//! Session lifecycle: redeem, restore after reload, end.

use std::sync::{Arc, Weak};

use super::{AppState, SessionMap};
use crate::clock::{spawn_ticker, ClockEvent, SessionClock};
use crate::protocol::ServerMessage;
use crate::session::{PlaySession, SessionError, SessionResult};
use crate::types::{ClockStatus, SessionId};

impl AppState {
    /// Create a session for a redeemed ticket, initialize and start its clock
    pub async fn redeem_session(
        &self,
        player_id: &str,
        budget_seconds: i64,
    ) -> SessionResult<Arc<PlaySession>> {
        let session_id = ulid::Ulid::new().to_string();
        let clock = Arc::new(SessionClock::new(
            session_id.clone(),
            self.clock_store.clone(),
            self.time.clone(),
        ));

        // A session whose budget did not persist must not start
        clock.initialize(budget_seconds).await?;

        let session = Arc::new(PlaySession::new(
            player_id,
            clock,
            self.selector.clone(),
            self.config.visibility,
        ));
        self.attach(&session);
        session.clock().start().await;

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), session.clone());

        tracing::info!(
            session_id = %session_id,
            player_id,
            budget_seconds,
            "Session redeemed"
        );
        Ok(session)
    }

    /// Reattach to a session after a reload or restart.
    ///
    /// Returns the live session if there is one, otherwise rebuilds its clock
    /// from the store, charging the time that passed in between.
    pub async fn restore_session(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> SessionResult<Arc<PlaySession>> {
        // Held across the load so one session never gets two clocks
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(session_id) {
            if existing.player_id != player_id {
                tracing::warn!(
                    session_id,
                    player_id,
                    "Resume attempt for another player's session"
                );
                return Err(SessionError::NotFound(session_id.to_string()));
            }
            return Ok(existing.clone());
        }

        let clock = Arc::new(SessionClock::new(
            session_id,
            self.clock_store.clone(),
            self.time.clone(),
        ));
        let session = Arc::new(PlaySession::new(
            player_id,
            clock,
            self.selector.clone(),
            self.config.visibility,
        ));

        // Subscribe first so an expiry found while reconciling is broadcast
        self.attach(&session);
        if !session.clock().load_from_persistence().await? {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        if session.clock().get_remaining().1 == ClockStatus::Expired {
            tracing::info!(session_id, player_id, "Restored session had already expired");
            return Ok(session);
        }

        sessions.insert(session_id.to_string(), session.clone());
        tracing::info!(session_id, player_id, "Session restored");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> SessionResult<Arc<PlaySession>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Terminate a session: reset its clock, clear persisted state, forget it
    pub async fn end_session(&self, session_id: &str) -> SessionResult<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        session.clock().reset(None).await?;
        self.broadcast_to_all(ServerMessage::SessionEnded {
            session_id: session_id.to_string(),
        });

        tracing::info!(session_id, "Session ended");
        Ok(())
    }

    /// Number of sessions currently held in memory
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Wire clock changes to the broadcast channel and start the ticker.
    ///
    /// An expired session is evicted from `sessions`; once the last handle is
    /// gone its clock drops and the ticker stops.
    fn attach(&self, session: &Arc<PlaySession>) {
        let tx = self.broadcast.clone();
        let time = self.time.clone();
        let session_id = session.id.clone();
        let sessions = Arc::downgrade(&self.sessions);
        let this = Arc::downgrade(session);

        let subscription = session.clock().subscribe(move |change| {
            let _ = tx.send(ServerMessage::ClockUpdate {
                session_id: session_id.clone(),
                remaining_seconds: change.remaining_seconds,
                status: change.status,
                server_now: time.now().to_rfc3339(),
            });

            if change.event == ClockEvent::Expired {
                tracing::info!(session_id = %session_id, "Session expired, forcing termination");
                let _ = tx.send(ServerMessage::SessionExpired {
                    session_id: session_id.clone(),
                });
                evict(sessions.clone(), this.clone(), session_id.clone());
            }
        });
        session.hold(subscription);

        spawn_ticker(session.clock(), self.config.tick_interval);
    }
}

/// Drop an expired session from the live map, unless it was replaced
fn evict(sessions: Weak<SessionMap>, session: Weak<PlaySession>, session_id: SessionId) {
    tokio::spawn(async move {
        let Some(sessions) = sessions.upgrade() else {
            return;
        };
        let mut sessions = sessions.write().await;
        let current = sessions
            .get(&session_id)
            .is_some_and(|live| Weak::ptr_eq(&Arc::downgrade(live), &session));
        if current {
            sessions.remove(&session_id);
            tracing::info!(session_id = %session_id, "Expired session evicted");
        }
    });
}
