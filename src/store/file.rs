//! JSON-file backed store.
//!
//! Layout under the data directory:
//! - `clocks/<session>.json` holds one [`ClockSnapshot`]
//! - `history/<player>/<game type>.json` holds the player's records for that game
//!
//! Writes go to a temp file first and are renamed into place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{apply_exposure, ClockSnapshot, ClockStore, HistoryStore, StoreError, StoreResult};
use crate::types::{ContentId, ContentRecord};

#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles on history files
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join("clocks")).await?;
        tokio::fs::create_dir_all(root.join("history")).await?;
        tracing::info!(root = %root.display(), "File store opened");

        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn clock_path(&self, session_id: &str) -> PathBuf {
        self.root
            .join("clocks")
            .join(format!("{}.json", encode_key(session_id)))
    }

    fn history_path(&self, player_id: &str, game_type: &str) -> PathBuf {
        self.root
            .join("history")
            .join(encode_key(player_id))
            .join(format!("{}.json", encode_key(game_type)))
    }

    async fn read_history(&self, path: &Path) -> StoreResult<HashMap<ContentId, ContentRecord>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::ReadFailure(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Write `bytes` to `path` via a sibling temp file
async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let write = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await
    };

    write
        .await
        .map_err(|e| StoreError::WriteFailure(format!("{}: {}", path.display(), e)))
}

/// Make an id safe to use as a file name
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[async_trait]
impl ClockStore for FileStore {
    async fn save(&self, session_id: &str, snapshot: &ClockSnapshot) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.clock_path(session_id), &bytes).await
    }

    async fn load(&self, session_id: &str) -> StoreResult<Option<ClockSnapshot>> {
        let path = self.clock_path(session_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::ReadFailure(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn clear(&self, session_id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.clock_path(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::WriteFailure(e.to_string())),
        }
    }
}

#[async_trait]
impl HistoryStore for FileStore {
    async fn upsert_seen(
        &self,
        player_id: &str,
        game_type: &str,
        content_id: &str,
        content_type: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<ContentRecord> {
        let path = self.history_path(player_id, game_type);
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_history(&path).await?;
        let record = apply_exposure(
            &mut records,
            player_id,
            game_type,
            content_id,
            content_type,
            at,
        );

        let bytes = serde_json::to_vec_pretty(&records)?;
        write_atomic(&path, &bytes).await?;
        Ok(record)
    }

    async fn list_seen(
        &self,
        player_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> StoreResult<Vec<ContentRecord>> {
        let records = self
            .read_history(&self.history_path(player_id, game_type))
            .await?;

        Ok(records
            .into_values()
            .filter(|r| r.content_type == content_type)
            .collect())
    }
}
