//! Stream Forwarder
//!
//! Merges any number of chunk sources into one output stream.
//!
//! - Items of one source keep their relative order.
//! - Prioritized ("forward first") sources are polled before the others on
//!   every poll of the output.
//! - Regular sources are served first-ready; the scan start rotates after
//!   every delivered item so one always-ready source cannot starve the rest.
//! - Sources are only polled when the consumer polls the output, so a slow
//!   consumer slows every producer down instead of filling a buffer.
//! - Cancellation drops every source and ends the output with one `abort`.
//! - A source failure becomes one `error` chunk, drops the siblings and ends
//!   the output.

use futures::Stream;
use futures::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::{ChunkStream, UiChunkStream};
use crate::error::StreamError;
use crate::types::UiChunk;
use crate::utils::cancel::CancelHandle;

/// Callback invoked once when the merged stream ends.
pub type FinishHandler = Arc<dyn Fn(&ForwardSummary) + Send + Sync>;

/// How a merged stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForwardSummary {
    /// Chunks delivered to the consumer, including a final `abort`/`error`
    /// emitted by the forwarder itself.
    pub chunks: usize,
    /// Ended by cancellation
    pub aborted: bool,
    /// Ended by a source failure
    pub errored: bool,
}

/// Forwarder configuration
#[derive(Clone)]
pub struct ForwarderConfig {
    /// Bound of the writer channel used by `create_ui_message_stream`.
    pub capacity: usize,
    /// Replace source error messages with a generic text.
    pub mask_errors: bool,
    /// Text used when `mask_errors` is set.
    pub masked_error_text: String,
    /// Reason attached to the `abort` chunk emitted on cancellation.
    pub abort_reason: Option<String>,
    pub on_finish: Option<FinishHandler>,
}

impl std::fmt::Debug for ForwarderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwarderConfig")
            .field("capacity", &self.capacity)
            .field("mask_errors", &self.mask_errors)
            .field("masked_error_text", &self.masked_error_text)
            .field("abort_reason", &self.abort_reason)
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            mask_errors: false,
            masked_error_text: "An error occurred.".to_string(),
            abort_reason: None,
            on_finish: None,
        }
    }
}

impl ForwarderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_mask_errors(mut self, mask: bool) -> Self {
        self.mask_errors = mask;
        self
    }

    pub fn with_masked_error_text(mut self, text: impl Into<String>) -> Self {
        self.masked_error_text = text.into();
        self
    }

    pub fn with_abort_reason(mut self, reason: impl Into<String>) -> Self {
        self.abort_reason = Some(reason.into());
        self
    }

    pub fn with_on_finish<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ForwardSummary) + Send + Sync + 'static,
    {
        self.on_finish = Some(Arc::new(handler));
        self
    }

    fn error_text(&self, error: &StreamError) -> String {
        if self.mask_errors {
            self.masked_error_text.clone()
        } else {
            error.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Priority {
    ForwardFirst,
    Normal,
}

/// Item produced by a forwarder source: a chunk to deliver, or a new source
/// to start merging (writer `merge`).
pub(crate) enum Forwarded {
    Chunk(UiChunk),
    Merge(ChunkStream),
}

pub(crate) type ForwardStream =
    Pin<Box<dyn Stream<Item = Result<Forwarded, StreamError>> + Send>>;

fn lift(stream: ChunkStream) -> ForwardStream {
    use futures::StreamExt;
    Box::pin(stream.map(|item| item.map(Forwarded::Chunk)))
}

struct Slot {
    stream: ForwardStream,
    priority: Priority,
}

/// Registered sources plus the rotating scan start for regular ones.
#[derive(Default)]
struct SourceSet {
    slots: Vec<Slot>,
    cursor: usize,
}

impl SourceSet {
    fn push(&mut self, stream: ForwardStream, priority: Priority) {
        self.slots.push(Slot { stream, priority });
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Forwarded, StreamError>>> {
        // Prioritized sources, in registration order.
        let mut i = 0;
        while i < self.slots.len() {
            if self.slots[i].priority == Priority::ForwardFirst {
                match self.slots[i].stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
                    Poll::Ready(None) => {
                        self.slots.remove(i);
                        continue;
                    }
                    Poll::Pending => {}
                }
            }
            i += 1;
        }

        // Regular sources, first ready wins, starting at the cursor.
        let normal: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.priority == Priority::Normal)
            .map(|(idx, _)| idx)
            .collect();
        let count = normal.len();
        let mut exhausted = Vec::new();
        let mut ready = None;

        for step in 0..count {
            let position = (self.cursor + step) % count;
            let idx = normal[position];
            match self.slots[idx].stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    self.cursor = position + 1;
                    ready = Some(item);
                    break;
                }
                Poll::Ready(None) => exhausted.push(idx),
                Poll::Pending => {}
            }
        }

        for idx in exhausted.into_iter().rev() {
            self.slots.remove(idx);
        }

        match ready {
            Some(item) => Poll::Ready(Some(item)),
            None if self.slots.is_empty() => Poll::Ready(None),
            None => Poll::Pending,
        }
    }
}

enum Event {
    Cancelled,
    Next(Option<Result<Forwarded, StreamError>>),
}

/// Merges chunk sources into a single stream.
pub struct StreamForwarder {
    config: ForwarderConfig,
    sources: SourceSet,
    cancel: CancelHandle,
}

impl std::fmt::Debug for StreamForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamForwarder")
            .field("config", &self.config)
            .field("sources", &self.sources.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Default for StreamForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamForwarder {
    pub fn new() -> Self {
        Self::with_config(ForwarderConfig::default())
    }

    pub fn with_config(config: ForwarderConfig) -> Self {
        Self {
            config,
            sources: SourceSet::default(),
            cancel: CancelHandle::new(),
        }
    }

    /// Register a prioritized source.
    pub fn forward_first<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<UiChunk, StreamError>> + Send + 'static,
    {
        self.sources.push(lift(Box::pin(stream)), Priority::ForwardFirst);
        self
    }

    /// Register a regular source.
    pub fn source<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<UiChunk, StreamError>> + Send + 'static,
    {
        self.sources.push(lift(Box::pin(stream)), Priority::Normal);
        self
    }

    /// Use an externally owned cancel handle.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub(crate) fn push_source(&mut self, stream: ForwardStream, priority: Priority) {
        self.sources.push(stream, priority);
    }

    /// Start forwarding.
    pub fn into_stream(self) -> UiChunkStream {
        let StreamForwarder {
            config,
            mut sources,
            cancel,
        } = self;

        let out = async_stream::stream! {
            let mut summary = ForwardSummary::default();
            tracing::debug!(sources = sources.len(), "stream forwarder started");

            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Event::Cancelled,
                    next = poll_fn(|cx| sources.poll_next(cx)) => Event::Next(next),
                };

                match event {
                    Event::Cancelled => {
                        sources.clear();
                        summary.aborted = true;
                        summary.chunks += 1;
                        tracing::debug!("stream forwarder cancelled");
                        yield UiChunk::Abort {
                            reason: config.abort_reason.clone(),
                        };
                        break;
                    }
                    Event::Next(None) => break,
                    Event::Next(Some(Ok(Forwarded::Chunk(chunk)))) => {
                        summary.chunks += 1;
                        yield chunk;
                    }
                    Event::Next(Some(Ok(Forwarded::Merge(stream)))) => {
                        sources.push(lift(stream), Priority::Normal);
                    }
                    Event::Next(Some(Err(error))) => {
                        tracing::warn!(error = %error, "stream source failed");
                        sources.clear();
                        summary.errored = true;
                        summary.chunks += 1;
                        yield UiChunk::error(config.error_text(&error));
                        break;
                    }
                }
            }

            tracing::debug!(
                chunks = summary.chunks,
                aborted = summary.aborted,
                errored = summary.errored,
                "stream forwarder finished"
            );
            if let Some(handler) = &config.on_finish {
                handler(&summary);
            }
        };

        Box::pin(out)
    }
}

/// Merge sources without priorities.
pub fn merge<I, S>(sources: I) -> UiChunkStream
where
    I: IntoIterator<Item = S>,
    S: Stream<Item = Result<UiChunk, StreamError>> + Send + 'static,
{
    sources
        .into_iter()
        .fold(StreamForwarder::new(), StreamForwarder::source)
        .into_stream()
}
