//! Persistence adapters for the session clock and the content history.
//!
//! Both are plain key/row stores. [`MemoryStore`] keeps everything in
//! process, [`FileStore`] writes JSON documents under a data directory.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{ClockState, ClockStatus, ContentId, ContentRecord};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Persistence write failed: {0}")]
    WriteFailure(String),

    #[error("Persistence read failed: {0}")]
    ReadFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persisted form of a clock, written after every mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub remaining_seconds: u64,
    pub status: ClockStatus,
    pub last_observed_wall_clock: Option<DateTime<Utc>>,
    pub total_budget_seconds: u64,
    /// Running time carried across a pause; absent in older snapshots
    #[serde(default)]
    pub carried_millis: u64,
    pub written_at: DateTime<Utc>,
}

impl ClockSnapshot {
    pub fn capture(state: &ClockState, written_at: DateTime<Utc>) -> Self {
        Self {
            remaining_seconds: state.remaining_seconds,
            status: state.status,
            last_observed_wall_clock: state.last_observed_wall_clock,
            total_budget_seconds: state.total_budget_seconds,
            carried_millis: state.carried_millis,
            written_at,
        }
    }

    /// Rebuild the in-memory state, re-applying the clamp and the Expired invariant
    pub fn into_state(self) -> ClockState {
        let remaining = self.remaining_seconds.min(self.total_budget_seconds);
        let remaining = if self.status == ClockStatus::Expired {
            0
        } else {
            remaining
        };
        ClockState {
            total_budget_seconds: self.total_budget_seconds,
            remaining_seconds: remaining,
            status: self.status,
            last_observed_wall_clock: self.last_observed_wall_clock,
            carried_millis: self.carried_millis,
        }
    }
}

/// Storage for session clock snapshots, keyed by session id
#[async_trait]
pub trait ClockStore: Send + Sync {
    async fn save(&self, session_id: &str, snapshot: &ClockSnapshot) -> StoreResult<()>;

    async fn load(&self, session_id: &str) -> StoreResult<Option<ClockSnapshot>>;

    async fn clear(&self, session_id: &str) -> StoreResult<()>;
}

/// Storage for content exposure records, unique on (player, game type, content id)
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Create the record with `times_seen = 1` or bump an existing one
    async fn upsert_seen(
        &self,
        player_id: &str,
        game_type: &str,
        content_id: &str,
        content_type: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<ContentRecord>;

    /// All records of one content category for a player within a game type
    async fn list_seen(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> StoreResult<Vec<ContentRecord>>;

    async fn list_seen_ids(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> StoreResult<HashSet<ContentId>> {
        Ok(self
            .list_seen(player_id, game_type, content_type)
            .await?
            .into_iter()
            .map(|r| r.content_id)
            .collect())
    }
}

/// Apply one exposure to a (player, game type) record map
pub(crate) fn apply_exposure(
    records: &mut HashMap<ContentId, ContentRecord>,
    player_id: &str,
    game_type: &str,
    content_id: &str,
    content_type: &str,
    at: DateTime<Utc>,
) -> ContentRecord {
    let record = records
        .entry(content_id.to_string())
        .and_modify(|r| {
            r.times_seen = r.times_seen.saturating_add(1);
            r.last_seen_at = r.last_seen_at.max(at);
            r.content_type = content_type.to_string();
        })
        .or_insert_with(|| ContentRecord {
            player_id: player_id.to_string(),
            game_type: game_type.to_string(),
            content_id: content_id.to_string(),
            content_type: content_type.to_string(),
            first_seen_at: at,
            last_seen_at: at,
            times_seen: 1,
        });
    record.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_704_067_200 + secs, 0).unwrap()
    }

    #[test]
    fn test_apply_exposure_creates_then_bumps() {
        let mut records = HashMap::new();

        let first = apply_exposure(&mut records, "p1", "trivia", "q1", "question", t(0));
        assert_eq!(first.times_seen, 1);
        assert_eq!(first.first_seen_at, first.last_seen_at);

        let second = apply_exposure(&mut records, "p1", "trivia", "q1", "question", t(10));
        assert_eq!(second.times_seen, 2);
        assert_eq!(second.first_seen_at, t(0));
        assert_eq!(second.last_seen_at, t(10));
    }

    #[test]
    fn test_apply_exposure_never_moves_last_seen_backwards() {
        let mut records = HashMap::new();
        apply_exposure(&mut records, "p1", "trivia", "q1", "question", t(100));

        let record = apply_exposure(
            &mut records,
            "p1",
            "trivia",
            "q1",
            "question",
            t(100) - Duration::seconds(50),
        );
        assert_eq!(record.times_seen, 2);
        assert_eq!(record.last_seen_at, t(100));
        assert!(record.last_seen_at >= record.first_seen_at);
    }

    #[test]
    fn test_snapshot_restores_expired_invariant() {
        let snapshot = ClockSnapshot {
            remaining_seconds: 7,
            status: ClockStatus::Expired,
            last_observed_wall_clock: Some(t(0)),
            total_budget_seconds: 10,
            carried_millis: 0,
            written_at: t(0),
        };
        let state = snapshot.into_state();
        assert_eq!(state.remaining_seconds, 0);
        assert_eq!(state.status, ClockStatus::Expired);
    }

    #[test]
    fn test_snapshot_clamps_remaining_to_budget() {
        let snapshot = ClockSnapshot {
            remaining_seconds: 500,
            status: ClockStatus::Paused,
            last_observed_wall_clock: None,
            total_budget_seconds: 60,
            carried_millis: 0,
            written_at: t(0),
        };
        assert_eq!(snapshot.into_state().remaining_seconds, 60);
    }
}
