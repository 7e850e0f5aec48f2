use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{apply_exposure, ClockSnapshot, ClockStore, HistoryStore, StoreResult};
use crate::types::{ContentId, ContentRecord, GameTypeId, PlayerId, SessionId};

type HistoryKey = (PlayerId, GameTypeId);

/// In-process store for both adapters
#[derive(Clone, Default)]
pub struct MemoryStore {
    clocks: Arc<RwLock<HashMap<SessionId, ClockSnapshot>>>,
    /// Indexed by (player, game type); content type is filtered per query
    history: Arc<RwLock<HashMap<HistoryKey, HashMap<ContentId, ContentRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClockStore for MemoryStore {
    async fn save(&self, session_id: &str, snapshot: &ClockSnapshot) -> StoreResult<()> {
        self.clocks
            .write()
            .await
            .insert(session_id.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> StoreResult<Option<ClockSnapshot>> {
        Ok(self.clocks.read().await.get(session_id).cloned())
    }

    async fn clear(&self, session_id: &str) -> StoreResult<()> {
        self.clocks.write().await.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn upsert_seen(
        &self,
        player_id: &str,
        game_type: &str,
        content_id: &str,
        content_type: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<ContentRecord> {
        let mut history = self.history.write().await;
        let records = history
            .entry((player_id.to_string(), game_type.to_string()))
            .or_default();

        Ok(apply_exposure(
            records,
            player_id,
            game_type,
            content_id,
            content_type,
            at,
        ))
    }

    async fn list_seen(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> StoreResult<Vec<ContentRecord>> {
        let history = self.history.read().await;
        let key = (player_id.to_string(), game_type.to_string());

        Ok(history
            .get(&key)
            .map(|records| {
                records
                    .values()
                    .filter(|r| r.content_type == content_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
