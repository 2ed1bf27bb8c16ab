//! Chunk store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SessionError;
use crate::types::UiChunk;

/// Zero-based position of a chunk within a session.
pub type Cursor = u64;

/// Chunks read from a cursor onwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSlice {
    pub chunks: Vec<UiChunk>,
    /// Cursor to continue reading from
    pub next_cursor: Cursor,
    /// No chunk will ever be appended after this slice
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub len: u64,
    pub complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage behind resumable sessions.
///
/// A store keeps an append-only chunk log per session id. Implementations
/// must make `wait_for` wake up on every append and on completion.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Create an empty session. Fails with `AlreadyExists` for a known id.
    async fn create(&self, session_id: &str) -> Result<(), SessionError>;

    /// Append a chunk and return its cursor. `complete` closes the session
    /// for further appends.
    async fn append(
        &self,
        session_id: &str,
        chunk: UiChunk,
        complete: bool,
    ) -> Result<Cursor, SessionError>;

    /// Close a session without appending.
    async fn mark_complete(&self, session_id: &str) -> Result<(), SessionError>;

    /// Every chunk at or after `cursor`.
    async fn read_from(&self, session_id: &str, cursor: Cursor) -> Result<ChunkSlice, SessionError>;

    /// Resolve once a chunk exists at `cursor` or the session is complete.
    async fn wait_for(&self, session_id: &str, cursor: Cursor) -> Result<(), SessionError>;

    /// Drop a session. Returns whether it existed.
    async fn remove(&self, session_id: &str) -> Result<bool, SessionError>;

    async fn list(&self) -> Result<Vec<SessionInfo>, SessionError>;
}
