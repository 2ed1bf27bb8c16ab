//! Core Streaming Types

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::error::StreamError;
use crate::reducer::{ResponseMessageOptions, handle_message_finish};
use crate::types::UiChunk;
use crate::utils::cancel::CancelHandle;

/// Fallible chunk stream, as produced by provider parsers, decoders and
/// session subscriptions.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<UiChunk, StreamError>> + Send>>;

/// Infallible chunk stream produced by the forwarder. Failures have already
/// been folded into `error` chunks.
pub type UiChunkStream = Pin<Box<dyn Stream<Item = UiChunk> + Send>>;

/// Byte stream suitable for HTTP response bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

static_assertions::assert_impl_all!(ChunkStream: Send, Unpin);
static_assertions::assert_impl_all!(UiChunkStream: Send, Unpin);

/// Merged stream with its cancellation handle.
pub struct UiChunkStreamHandle {
    /// The merged stream
    pub stream: UiChunkStream,
    /// Cancels every source and ends the stream with an `abort` chunk
    pub cancel: CancelHandle,
}

impl UiChunkStreamHandle {
    /// Track the response message this stream builds and report it to the
    /// finish handlers of `options`.
    pub fn with_response_message(self, options: ResponseMessageOptions) -> Self {
        Self {
            stream: handle_message_finish(self.stream, options),
            cancel: self.cancel,
        }
    }
}

impl std::fmt::Debug for UiChunkStreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiChunkStreamHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
