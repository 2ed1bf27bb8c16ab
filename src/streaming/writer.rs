//! Imperative stream construction
//!
//! `create_ui_message_stream` hands an async producer a writer. Chunks
//! written through it are delivered ahead of any merged source; `merge`
//! attaches further sources while the stream is running.

use futures::{Stream, StreamExt};
use std::future::Future;
use tokio::sync::mpsc;

use super::forwarder::{ForwardStream, Forwarded, Priority};
use super::{ForwarderConfig, StreamForwarder, UiChunkStreamHandle};
use crate::error::StreamError;
use crate::types::UiChunk;
use crate::utils::cancel::CancelHandle;

/// Writer given to the producer of `create_ui_message_stream`.
///
/// Writes go through a bounded channel: when the consumer falls behind,
/// `write` waits instead of dropping chunks.
#[derive(Clone)]
pub struct UiMessageStreamWriter {
    tx: mpsc::Sender<Result<Forwarded, StreamError>>,
    cancel: CancelHandle,
}

impl std::fmt::Debug for UiMessageStreamWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiMessageStreamWriter")
            .field("capacity", &self.tx.capacity())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl UiMessageStreamWriter {
    /// Send one chunk. Fails with `StreamError::Cancelled` once the merged
    /// stream was cancelled or dropped.
    pub async fn write(&self, chunk: UiChunk) -> Result<(), StreamError> {
        self.tx
            .send(Ok(Forwarded::Chunk(chunk)))
            .await
            .map_err(|_| StreamError::Cancelled)
    }

    /// Attach another source. Its chunks are interleaved with the other
    /// regular sources.
    pub async fn merge<S>(&self, stream: S) -> Result<(), StreamError>
    where
        S: Stream<Item = Result<UiChunk, StreamError>> + Send + 'static,
    {
        self.tx
            .send(Ok(Forwarded::Merge(Box::pin(stream))))
            .await
            .map_err(|_| StreamError::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

/// Build a stream from an async producer.
///
/// `execute` runs as one of the forwarder's sources and is only driven while
/// the returned stream is polled. If it returns `Err`, the stream ends with
/// an `error` chunk.
pub fn create_ui_message_stream<F, Fut>(config: ForwarderConfig, execute: F) -> UiChunkStreamHandle
where
    F: FnOnce(UiMessageStreamWriter) -> Fut,
    Fut: Future<Output = Result<(), StreamError>> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(config.capacity.max(1));
    let cancel = CancelHandle::new();
    let error_tx = tx.clone();
    let writer = UiMessageStreamWriter {
        tx,
        cancel: cancel.clone(),
    };
    let producer = execute(writer);

    let written: ForwardStream = Box::pin(async_stream::stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
    });
    // The producer's failure travels through the channel so that chunks it
    // wrote before failing are delivered first.
    let executed: ForwardStream = Box::pin(
        futures::stream::once(async move {
            if let Err(error) = producer.await {
                let _ = error_tx.send(Err(error)).await;
            }
        })
        .filter_map(|()| futures::future::ready(None)),
    );

    let mut forwarder = StreamForwarder::with_config(config).with_cancel_handle(cancel.clone());
    forwarder.push_source(written, Priority::ForwardFirst);
    forwarder.push_source(executed, Priority::Normal);

    UiChunkStreamHandle {
        stream: forwarder.into_stream(),
        cancel,
    }
}
