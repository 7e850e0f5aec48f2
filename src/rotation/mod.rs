//! Content rotation
//!
//! Hands out content a player has not seen yet within a game type and
//! category. Once the whole pool has been seen it falls back to the
//! least-recently-seen item instead of failing.
//!
//! Picking and recording are separate calls and are not atomic. Two
//! concurrent picks for the same player and category may return the same
//! item; that only shows a repeat early, so no locking is done.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use std::collections::HashMap;
use std::sync::Arc;

use crate::store::HistoryStore;
use crate::time::TimeSource;
use crate::types::{ContentItem, ContentRecord, Progress};

/// Result type for selector operations
pub type SelectorResult<T> = Result<T, SelectorError>;

#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("No content available for {game_type}/{content_type}")]
    EmptyPool {
        game_type: String,
        content_type: String,
    },
}

/// How an item was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickReason {
    /// Uniformly among items the player has not seen
    Unseen,
    /// Pool exhausted, oldest exposure wins
    LeastRecentlySeen,
}

#[derive(Debug, Clone)]
pub struct Pick {
    pub item: ContentItem,
    pub reason: PickReason,
}

pub struct ContentSelector {
    history: Arc<dyn HistoryStore>,
    time: Arc<dyn TimeSource>,
}

impl ContentSelector {
    pub fn new(history: Arc<dyn HistoryStore>, time: Arc<dyn TimeSource>) -> Self {
        Self { history, time }
    }

    /// Return one item from `pool` for this player, preferring unseen ones
    pub async fn pick_unseen(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
        pool: &[ContentItem],
    ) -> SelectorResult<ContentItem> {
        self.pick(player_id, game_type, content_type, pool)
            .await
            .map(|pick| pick.item)
    }

    /// Like `pick_unseen`, also reporting which policy chose the item
    pub async fn pick(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
        pool: &[ContentItem],
    ) -> SelectorResult<Pick> {
        if pool.is_empty() {
            tracing::error!(game_type, content_type, "Content pool is empty");
            return Err(SelectorError::EmptyPool {
                game_type: game_type.to_string(),
                content_type: content_type.to_string(),
            });
        }

        let records = self.seen_records(player_id, game_type, content_type).await;
        let pick = choose(pool, &records);

        tracing::debug!(
            player_id,
            game_type,
            content_type,
            content_id = %pick.item.id,
            reason = ?pick.reason,
            "Picked content"
        );
        Ok(pick)
    }

    /// Record that an item was actually shown. Failures are logged, never returned.
    ///
    /// Call once per pick that is committed to display, not for items that
    /// were fetched and then discarded.
    pub async fn record_seen(
        &self,
        player_id: &str,
        game_type: &str,
        content_id: &str,
        content_type: &str,
    ) -> Option<ContentRecord> {
        let now = self.time.now();
        match self
            .history
            .upsert_seen(player_id, game_type, content_id, content_type, now)
            .await
        {
            Ok(record) => {
                tracing::debug!(
                    player_id,
                    game_type,
                    content_id,
                    times_seen = record.times_seen,
                    "Recorded content exposure"
                );
                Some(record)
            }
            Err(e) => {
                tracing::error!(
                    player_id,
                    game_type,
                    content_id,
                    error = %e,
                    "Failed to record content exposure"
                );
                None
            }
        }
    }

    /// Number of distinct items of this category the player has seen
    pub async fn get_seen_count(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> usize {
        self.seen_records(player_id, game_type, content_type)
            .await
            .len()
    }

    /// Seen/total over a specific pool, for "12/40 questions" displays
    pub async fn progress(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
        pool: &[ContentItem],
    ) -> Progress {
        let records = self.seen_records(player_id, game_type, content_type).await;
        let seen = pool
            .iter()
            .filter(|item| records.iter().any(|r| r.content_id == item.id))
            .count();

        Progress {
            seen,
            total: pool.len(),
        }
    }

    /// Exposure history, or nothing if the store cannot be read.
    /// Gameplay goes on with possible early repeats.
    async fn seen_records(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> Vec<ContentRecord> {
        match self
            .history
            .list_seen(player_id, game_type, content_type)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    player_id,
                    game_type,
                    content_type,
                    error = %e,
                    "Failed to read content history, treating everything as unseen"
                );
                Vec::new()
            }
        }
    }
}

/// Unseen items win uniformly at random. With none left the item with the
/// oldest `last_seen_at` is chosen; ties go to fewer `times_seen`, then to
/// the smaller content id.
fn choose(pool: &[ContentItem], records: &[ContentRecord]) -> Pick {
    let seen: HashMap<&str, &ContentRecord> = records
        .iter()
        .map(|r| (r.content_id.as_str(), r))
        .collect();

    let unseen: Vec<&ContentItem> = pool
        .iter()
        .filter(|item| !seen.contains_key(item.id.as_str()))
        .collect();

    if let Some(item) = unseen.choose(&mut rand::rng()) {
        return Pick {
            item: (*item).clone(),
            reason: PickReason::Unseen,
        };
    }

    let exposure = |item: &ContentItem| {
        let record = seen.get(item.id.as_str());
        (
            record
                .map(|r| r.last_seen_at)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            record.map(|r| r.times_seen).unwrap_or(0),
        )
    };
    let oldest = pool
        .iter()
        .min_by(|a, b| {
            exposure(a)
                .cmp(&exposure(b))
                .then_with(|| a.id.cmp(&b.id))
        })
        .unwrap_or(&pool[0]);

    Pick {
        item: oldest.clone(),
        reason: PickReason::LeastRecentlySeen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use crate::time::ManualTime;
    use crate::types::ContentBody;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashSet;

    fn item(id: &str) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            game_type: "emoji-guess".to_string(),
            content_type: "emoji".to_string(),
            body: ContentBody::Emoji {
                emojis: "🎬".to_string(),
                answer: id.to_string(),
            },
        }
    }

    fn setup() -> (ContentSelector, Arc<ManualTime>, Arc<MemoryStore>) {
        let time = Arc::new(ManualTime::at_epoch());
        let store = Arc::new(MemoryStore::new());
        let selector = ContentSelector::new(store.clone(), time.clone());
        (selector, time, store)
    }

    /// Pick, show, record, then let a second pass
    async fn cycle(selector: &ContentSelector, time: &ManualTime, pool: &[ContentItem]) -> Pick {
        let pick = selector
            .pick("p1", "emoji-guess", "emoji", pool)
            .await
            .unwrap();
        selector
            .record_seen("p1", "emoji-guess", &pick.item.id, "emoji")
            .await
            .unwrap();
        time.advance(Duration::seconds(1));
        pick
    }

    #[tokio::test]
    async fn test_three_picks_are_a_permutation_then_oldest() {
        let (selector, time, _store) = setup();
        let pool = vec![item("A"), item("B"), item("C")];

        let mut ids = Vec::new();
        for _ in 0..3 {
            let pick = cycle(&selector, &time, &pool).await;
            assert_eq!(pick.reason, PickReason::Unseen);
            ids.push(pick.item.id);
        }

        let unique: HashSet<_> = ids.iter().cloned().collect();
        assert_eq!(unique.len(), 3);

        let fourth = cycle(&selector, &time, &pool).await;
        assert_eq!(fourth.reason, PickReason::LeastRecentlySeen);
        assert_eq!(fourth.item.id, ids[0]);

        let fifth = cycle(&selector, &time, &pool).await;
        assert_eq!(fifth.item.id, ids[1]);
    }

    #[tokio::test]
    async fn test_every_item_seen_before_any_repeat() {
        let (selector, time, store) = setup();
        let pool: Vec<ContentItem> = (0..25).map(|i| item(&format!("item-{:02}", i))).collect();

        let mut shown = HashSet::new();
        for _ in 0..pool.len() {
            let pick = cycle(&selector, &time, &pool).await;
            assert!(shown.insert(pick.item.id), "item repeated before exhaustion");
        }

        let records = store.list_seen("p1", "emoji-guess", "emoji").await.unwrap();
        assert_eq!(records.len(), pool.len());
        assert!(records.iter().all(|r| r.times_seen >= 1));

        // One more still works
        let extra = cycle(&selector, &time, &pool).await;
        assert_eq!(extra.reason, PickReason::LeastRecentlySeen);
    }

    #[tokio::test]
    async fn test_empty_pool_is_an_error() {
        let (selector, _time, _store) = setup();
        let result = selector.pick_unseen("p1", "trivia", "question", &[]).await;

        match result {
            Err(SelectorError::EmptyPool {
                game_type,
                content_type,
            }) => {
                assert_eq!(game_type, "trivia");
                assert_eq!(content_type, "question");
            }
            other => panic!("expected EmptyPool, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_record_seen_twice() {
        let (selector, time, _store) = setup();
        let first_at = time.now();

        selector.record_seen("p1", "trivia", "q1", "question").await;
        time.advance(Duration::seconds(30));
        let record = selector
            .record_seen("p1", "trivia", "q1", "question")
            .await
            .unwrap();

        assert_eq!(record.times_seen, 2);
        assert_eq!(record.first_seen_at, first_at);
        assert_eq!(record.last_seen_at, time.now());
    }

    #[tokio::test]
    async fn test_history_is_per_player_and_game_type() {
        let (selector, _time, _store) = setup();
        let pool = vec![item("A")];

        selector.record_seen("p1", "emoji-guess", "A", "emoji").await;

        // Another player still gets it as unseen
        let pick = selector
            .pick("p2", "emoji-guess", "emoji", &pool)
            .await
            .unwrap();
        assert_eq!(pick.reason, PickReason::Unseen);

        // Same player, other game type, same id
        let pick = selector.pick("p1", "quiz", "emoji", &pool).await.unwrap();
        assert_eq!(pick.reason, PickReason::Unseen);

        assert_eq!(selector.get_seen_count("p1", "emoji-guess", "emoji").await, 1);
        assert_eq!(selector.get_seen_count("p2", "emoji-guess", "emoji").await, 0);
    }

    #[tokio::test]
    async fn test_progress_counts_only_pool_items() {
        let (selector, _time, _store) = setup();
        let pool = vec![item("A"), item("B"), item("C"), item("D")];

        selector.record_seen("p1", "emoji-guess", "A", "emoji").await;
        selector.record_seen("p1", "emoji-guess", "C", "emoji").await;
        selector.record_seen("p1", "emoji-guess", "retired", "emoji").await;

        let progress = selector.progress("p1", "emoji-guess", "emoji", &pool).await;
        assert_eq!(progress, Progress { seen: 2, total: 4 });
    }

    #[test]
    fn test_least_recently_seen_tie_break() {
        let at = Utc::now();
        let record = |id: &str, times_seen: u32| ContentRecord {
            player_id: "p1".to_string(),
            game_type: "emoji-guess".to_string(),
            content_id: id.to_string(),
            content_type: "emoji".to_string(),
            first_seen_at: at,
            last_seen_at: at,
            times_seen,
        };
        let pool = vec![item("C"), item("B"), item("A")];

        // Same timestamp and count: smallest id
        let records = vec![record("A", 1), record("B", 1), record("C", 1)];
        assert_eq!(choose(&pool, &records).item.id, "A");

        // Same timestamp: fewer exposures first
        let records = vec![record("A", 3), record("B", 1), record("C", 2)];
        assert_eq!(choose(&pool, &records).item.id, "B");
    }

    #[tokio::test]
    async fn test_concurrent_picks_may_repeat_without_failing() {
        let (selector, _time, store) = setup();
        let pool = vec![item("A")];

        let (first, second) = tokio::join!(
            selector.pick_unseen("p1", "emoji-guess", "emoji", &pool),
            selector.pick_unseen("p1", "emoji-guess", "emoji", &pool),
        );
        assert_eq!(first.unwrap().id, "A");
        assert_eq!(second.unwrap().id, "A");

        selector.record_seen("p1", "emoji-guess", "A", "emoji").await;
        selector.record_seen("p1", "emoji-guess", "A", "emoji").await;
        let records = store.list_seen("p1", "emoji-guess", "emoji").await.unwrap();
        assert_eq!(records[0].times_seen, 2);
    }

    /// History store whose every call fails
    struct BrokenHistory;

    #[async_trait]
    impl HistoryStore for BrokenHistory {
        async fn upsert_seen(
            &self,
            _player_id: &str,
            _game_type: &str,
            _content_id: &str,
            _content_type: &str,
            _at: DateTime<Utc>,
        ) -> StoreResult<ContentRecord> {
            Err(StoreError::WriteFailure("connection reset".to_string()))
        }

        async fn list_seen(
            &self,
            _player_id: &str,
            _game_type: &str,
            _content_type: &str,
        ) -> StoreResult<Vec<ContentRecord>> {
            Err(StoreError::ReadFailure("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_storage_failures_never_block_gameplay() {
        let selector =
            ContentSelector::new(Arc::new(BrokenHistory), Arc::new(ManualTime::at_epoch()));
        let pool = vec![item("A"), item("B")];

        let picked = selector
            .pick_unseen("p1", "emoji-guess", "emoji", &pool)
            .await
            .unwrap();
        assert!(pool.contains(&picked));

        assert!(selector
            .record_seen("p1", "emoji-guess", &picked.id, "emoji")
            .await
            .is_none());
        assert_eq!(selector.get_seen_count("p1", "emoji-guess", "emoji").await, 0);
    }
}
