//! In-process chunk store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

use super::store::{ChunkSlice, ChunkStore, Cursor, SessionInfo};
use crate::error::SessionError;
use crate::types::UiChunk;

/// (len, complete) published on every change
type Progress = (u64, bool);

struct SessionEntry {
    chunks: Vec<UiChunk>,
    complete: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    progress: watch::Sender<Progress>,
}

impl SessionEntry {
    fn new() -> Self {
        let now = Utc::now();
        let (progress, _) = watch::channel((0, false));
        Self {
            chunks: Vec::new(),
            complete: false,
            created_at: now,
            updated_at: now,
            progress,
        }
    }

    fn publish(&mut self) {
        self.updated_at = Utc::now();
        self.progress
            .send_replace((self.chunks.len() as u64, self.complete));
    }

    fn info(&self, id: &str) -> SessionInfo {
        SessionInfo {
            id: id.to_string(),
            len: self.chunks.len() as u64,
            complete: self.complete,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Chunk store kept in memory, shared by cloning.
#[derive(Clone, Default)]
pub struct InMemoryChunkStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl std::fmt::Debug for InMemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChunkStore").finish_non_exhaustive()
    }
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn create(&self, session_id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session_id) {
            return Err(SessionError::AlreadyExists(session_id.to_string()));
        }
        sessions.insert(session_id.to_string(), SessionEntry::new());
        Ok(())
    }

    async fn append(
        &self,
        session_id: &str,
        chunk: UiChunk,
        complete: bool,
    ) -> Result<Cursor, SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if entry.complete {
            return Err(SessionError::Completed(session_id.to_string()));
        }
        let cursor = entry.chunks.len() as Cursor;
        entry.chunks.push(chunk);
        entry.complete = complete;
        entry.publish();
        Ok(cursor)
    }

    async fn mark_complete(&self, session_id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if !entry.complete {
            entry.complete = true;
            entry.publish();
        }
        Ok(())
    }

    async fn read_from(&self, session_id: &str, cursor: Cursor) -> Result<ChunkSlice, SessionError> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        let start = usize::try_from(cursor)
            .unwrap_or(usize::MAX)
            .min(entry.chunks.len());
        let chunks = entry.chunks[start..].to_vec();
        Ok(ChunkSlice {
            next_cursor: cursor.max(entry.chunks.len() as Cursor),
            chunks,
            complete: entry.complete,
        })
    }

    async fn wait_for(&self, session_id: &str, cursor: Cursor) -> Result<(), SessionError> {
        // Subscribing under the read lock means no append can slip in between
        // the check and the subscription.
        let mut progress = {
            let sessions = self.sessions.read().await;
            let entry = sessions
                .get(session_id)
                .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
            if entry.chunks.len() as Cursor > cursor || entry.complete {
                return Ok(());
            }
            entry.progress.subscribe()
        };

        loop {
            if progress.changed().await.is_err() {
                return Err(SessionError::NotFound(session_id.to_string()));
            }
            let (len, complete) = *progress.borrow_and_update();
            if len > cursor || complete {
                return Ok(());
            }
        }
    }

    async fn remove(&self, session_id: &str) -> Result<bool, SessionError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }

    async fn list(&self) -> Result<Vec<SessionInfo>, SessionError> {
        let sessions = self.sessions.read().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .map(|(id, entry)| entry.info(id))
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(infos)
    }
}
