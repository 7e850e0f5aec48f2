mod content;
mod sessions;

use crate::catalog::ContentCatalog;
use crate::config::AppConfig;
use crate::protocol::ServerMessage;
use crate::rotation::ContentSelector;
use crate::session::PlaySession;
use crate::store::{ClockStore, FileStore, HistoryStore, MemoryStore, StoreResult};
use crate::time::{SystemTime, TimeSource};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Live sessions by id
pub type SessionMap = RwLock<HashMap<SessionId, Arc<PlaySession>>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Live sessions, one clock each. Expired sessions are evicted.
    pub sessions: Arc<SessionMap>,
    pub catalog: Arc<ContentCatalog>,
    pub clock_store: Arc<dyn ClockStore>,
    /// Shared by all sessions; it holds no per-session state
    pub selector: Arc<ContentSelector>,
    pub time: Arc<dyn TimeSource>,
    pub config: AppConfig,
    /// Broadcast channel for clock updates and expirations
    pub broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        catalog: ContentCatalog,
        clock_store: Arc<dyn ClockStore>,
        history_store: Arc<dyn HistoryStore>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            catalog: Arc::new(catalog),
            clock_store,
            selector: Arc::new(ContentSelector::new(history_store, time.clone())),
            time,
            config,
            broadcast: tx,
        }
    }

    /// In-memory stores, built-in catalog, system time
    pub fn in_memory() -> Self {
        Self::with_time(Arc::new(SystemTime))
    }

    /// In-memory stores and built-in catalog with a custom time source
    pub fn with_time(time: Arc<dyn TimeSource>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(
            AppConfig::default(),
            ContentCatalog::builtin(),
            store.clone(),
            store,
            time,
        )
    }

    /// Build state from config: file stores when a data dir is set
    pub async fn from_config(config: AppConfig, catalog: ContentCatalog) -> StoreResult<Self> {
        let time: Arc<dyn TimeSource> = Arc::new(SystemTime);
        let state = match config.data_dir.clone() {
            Some(dir) => {
                let store = Arc::new(FileStore::open(dir).await?);
                Self::new(config, catalog, store.clone(), store, time)
            }
            None => {
                tracing::warn!("No data dir configured, sessions will not survive a restart");
                let store = Arc::new(MemoryStore::new());
                Self::new(config, catalog, store.clone(), store, time)
            }
        };
        Ok(state)
    }

    /// Send to all connected clients. Having no receivers is fine.
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        let _ = self.broadcast.send(msg);
    }

    pub fn server_now(&self) -> String {
        self.time.now().to_rfc3339()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}
