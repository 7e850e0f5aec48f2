use super::AppState;
use crate::session::{SessionError, SessionResult};
use crate::types::*;

impl AppState {
    /// Catalog items available for one game screen
    pub fn content_pool(&self, game_type: &str, content_type: &str) -> Vec<ContentItem> {
        self.catalog.pool(game_type, content_type)
    }

    /// Pick the next item for a session's game screen, with progress over the pool.
    ///
    /// The pick is not recorded; the client confirms once the item is on screen.
    pub async fn next_content(
        &self,
        session_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> SessionResult<(ContentItem, Progress)> {
        let session = self.get_session(session_id).await?;
        let pool = self.content_pool(game_type, content_type);

        let item = session.next_content(game_type, content_type, &pool).await?;
        let progress = session.progress(game_type, content_type, &pool).await;
        Ok((item, progress))
    }

    /// Record that a catalog item was shown to the session's player.
    ///
    /// Returns `Ok(None)` when the history write failed; that is logged and
    /// never blocks the game.
    pub async fn confirm_shown(
        &self,
        session_id: &str,
        game_type: &str,
        content_id: &str,
    ) -> SessionResult<Option<ContentRecord>> {
        let session = self.get_session(session_id).await?;
        let item = self
            .catalog
            .get(game_type, content_id)
            .ok_or_else(|| SessionError::UnknownContent(content_id.to_string()))?;

        Ok(session.confirm_shown(item).await)
    }

    pub async fn seen_count(
        &self,
        session_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> SessionResult<usize> {
        let session = self.get_session(session_id).await?;
        Ok(session.seen_count(game_type, content_type).await)
    }

    /// Seen/total for a session's player over the current catalog pool
    pub async fn progress(
        &self,
        session_id: &str,
        game_type: &str,
        content_type: &str,
    ) -> SessionResult<Progress> {
        let session = self.get_session(session_id).await?;
        let pool = self.content_pool(game_type, content_type);
        Ok(session.progress(game_type, content_type, &pool).await)
    }
}
