//! Resumable Stream Sessions
//!
//! A session is an id-keyed, append-only chunk log. One writer appends the
//! chunks of a running stream; any number of readers subscribe from a
//! cursor, get the buffered chunks replayed and then follow the live tail
//! until the session completes. A client that lost its connection resumes
//! by subscribing again from the last cursor it saw.

mod memory;
mod store;

pub use memory::InMemoryChunkStore;
pub use store::{ChunkSlice, ChunkStore, Cursor, SessionInfo};

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{SessionError, StreamError};
use crate::streaming::ChunkStream;
use crate::types::UiChunk;

/// Stream of `(cursor, chunk)` pairs.
pub type CursorChunkStream =
    Pin<Box<dyn Stream<Item = Result<(Cursor, UiChunk), StreamError>> + Send>>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a completed session stays replayable
    pub retention: chrono::Duration,
    /// Maximum chunks per session
    pub max_chunks: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retention: chrono::Duration::minutes(10),
            max_chunks: Some(50_000),
        }
    }
}

impl SessionConfig {
    pub fn with_retention(mut self, retention: chrono::Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_max_chunks(mut self, max_chunks: Option<usize>) -> Self {
        self.max_chunks = max_chunks;
        self
    }
}

/// Write access to one session. There is exactly one per session: it is not
/// `Clone`, and opening an existing id fails.
#[derive(Debug)]
pub struct SessionHandle {
    session_id: String,
    appended: u64,
    complete: bool,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Chunks appended through this handle.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Front-end over a [`ChunkStore`].
pub struct ResumableStreams<S = InMemoryChunkStore> {
    store: Arc<S>,
    config: SessionConfig,
}

impl<S> Clone for ResumableStreams<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> std::fmt::Debug for ResumableStreams<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumableStreams")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ResumableStreams<InMemoryChunkStore> {
    fn default() -> Self {
        Self::new(InMemoryChunkStore::new())
    }
}

impl<S: ChunkStore + 'static> ResumableStreams<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, SessionConfig::default())
    }

    pub fn with_config(store: S, config: SessionConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a session and take its write handle.
    pub async fn open(&self, session_id: impl Into<String>) -> Result<SessionHandle, SessionError> {
        let session_id = session_id.into();
        self.store.create(&session_id).await?;
        tracing::debug!(session_id = %session_id, "session opened");
        Ok(SessionHandle {
            session_id,
            appended: 0,
            complete: false,
        })
    }

    /// Create a session under a freshly generated id.
    pub async fn open_new(&self) -> Result<SessionHandle, SessionError> {
        self.open(crate::utils::generate_id("sess")).await
    }

    /// Append a chunk. A terminal chunk completes the session.
    pub async fn append(
        &self,
        handle: &mut SessionHandle,
        chunk: UiChunk,
    ) -> Result<Cursor, SessionError> {
        if handle.complete {
            return Err(SessionError::Completed(handle.session_id.clone()));
        }
        if let Some(limit) = self.config.max_chunks
            && handle.appended >= limit as u64
        {
            return Err(SessionError::CapacityExceeded {
                session_id: handle.session_id.clone(),
                limit,
            });
        }

        let terminal = chunk.is_terminal();
        let cursor = self
            .store
            .append(&handle.session_id, chunk, terminal)
            .await?;
        handle.appended += 1;
        if terminal {
            handle.complete = true;
            tracing::debug!(
                session_id = %handle.session_id,
                chunks = handle.appended,
                "session complete"
            );
        }
        Ok(cursor)
    }

    /// Complete a session that ended without a terminal chunk.
    pub async fn close(&self, handle: SessionHandle) -> Result<(), SessionError> {
        if !handle.complete {
            self.store.mark_complete(&handle.session_id).await?;
        }
        Ok(())
    }

    /// Replay from `from`, then follow the live tail until completion.
    pub fn subscribe(&self, session_id: &str, from: Cursor) -> ChunkStream {
        Box::pin(
            self.subscribe_with_cursor(session_id, from)
                .map(|item| item.map(|(_, chunk)| chunk)),
        )
    }

    /// Like [`subscribe`](Self::subscribe), with each chunk's cursor.
    pub fn subscribe_with_cursor(&self, session_id: &str, from: Cursor) -> CursorChunkStream {
        let store = self.store.clone();
        let session_id = session_id.to_string();

        let out = async_stream::stream! {
            let mut cursor = from;
            loop {
                let slice = match store.read_from(&session_id, cursor).await {
                    Ok(slice) => slice,
                    Err(e) => {
                        yield Err(StreamError::from(e));
                        return;
                    }
                };
                for chunk in slice.chunks {
                    yield Ok((cursor, chunk));
                    cursor += 1;
                }
                cursor = cursor.max(slice.next_cursor);
                if slice.complete {
                    return;
                }
                if let Err(e) = store.wait_for(&session_id, cursor).await {
                    yield Err(StreamError::from(e));
                    return;
                }
            }
        };
        Box::pin(out)
    }

    /// Open `session_id` and append every chunk of `stream` to it. The
    /// session is completed when the stream ends. Returns the chunk count.
    ///
    /// If an append fails the session is still completed, with a final
    /// `error` chunk when the store accepts one, and the append error is
    /// returned.
    pub async fn pipe<St>(&self, session_id: impl Into<String>, stream: St) -> Result<u64, SessionError>
    where
        St: Stream<Item = UiChunk> + Send,
    {
        let mut handle = self.open(session_id).await?;
        let mut stream = Box::pin(stream);
        while let Some(chunk) = stream.next().await {
            if let Err(e) = self.append(&mut handle, chunk).await {
                self.abandon(handle, &e).await;
                return Err(e);
            }
            if handle.complete {
                break;
            }
        }
        let appended = handle.appended;
        self.close(handle).await?;
        Ok(appended)
    }

    /// Complete a session whose writer failed so readers stop waiting.
    async fn abandon(&self, handle: SessionHandle, cause: &SessionError) {
        tracing::warn!(session_id = %handle.session_id, error = %cause, "session writer failed");
        let closing = UiChunk::error(cause.to_string());
        if self
            .store
            .append(&handle.session_id, closing, true)
            .await
            .is_ok()
        {
            return;
        }
        if let Err(e) = self.store.mark_complete(&handle.session_id).await {
            tracing::warn!(session_id = %handle.session_id, error = %e, "failed to complete session");
        }
    }

    pub async fn sessions(&self) -> Result<Vec<SessionInfo>, SessionError> {
        self.store.list().await
    }

    /// Remove completed sessions whose last update is older than the
    /// retention window. Returns how many were removed.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        let mut evicted = 0;
        for info in self.store.list().await? {
            if info.complete
                && info.updated_at + self.config.retention <= now
                && self.store.remove(&info.id).await?
            {
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::debug!(evicted, "expired sessions evicted");
        }
        Ok(evicted)
    }
}
