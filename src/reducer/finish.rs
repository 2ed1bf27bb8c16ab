//! Response message tracking
//!
//! Folds an outgoing chunk stream into the assistant message it produces,
//! so a server can persist the conversation once the stream ends. When the
//! last original message is from the assistant, the stream continues that
//! message instead of starting a new one.

use futures::{Stream, StreamExt};
use std::sync::Arc;

use super::{MessageState, ReducerConfig};
use crate::streaming::UiChunkStream;
use crate::types::{Role, UiChunk, UiMessage};

/// The conversation as it stands when a stream (or one of its steps) ends.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageFinish {
    /// Original messages followed by the response message. A continued
    /// assistant message is replaced, not repeated.
    pub messages: Vec<UiMessage>,
    pub response_message: UiMessage,
    /// The stream extended the last original message
    pub is_continuation: bool,
    /// An `abort` chunk went through the stream
    pub is_aborted: bool,
}

pub type MessageFinishHandler = Arc<dyn Fn(MessageFinish) + Send + Sync>;

/// Options for [`handle_message_finish`].
#[derive(Clone, Default)]
pub struct ResponseMessageOptions {
    /// Id given to a `start` chunk that carries none. Ignored when
    /// continuing an assistant message, whose id is used instead.
    pub message_id: Option<String>,
    pub original_messages: Vec<UiMessage>,
    pub reducer: ReducerConfig,
    /// Called once when the stream ends or the consumer drops it.
    pub on_finish: Option<MessageFinishHandler>,
    /// Called on every `finish-step` chunk.
    pub on_step_finish: Option<MessageFinishHandler>,
}

impl std::fmt::Debug for ResponseMessageOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseMessageOptions")
            .field("message_id", &self.message_id)
            .field("original_messages", &self.original_messages.len())
            .field("reducer", &self.reducer)
            .field("has_on_finish", &self.on_finish.is_some())
            .field("has_on_step_finish", &self.on_step_finish.is_some())
            .finish()
    }
}

impl ResponseMessageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_original_messages(mut self, messages: Vec<UiMessage>) -> Self {
        self.original_messages = messages;
        self
    }

    pub fn with_reducer_config(mut self, config: ReducerConfig) -> Self {
        self.reducer = config;
        self
    }

    pub fn with_on_finish<F>(mut self, handler: F) -> Self
    where
        F: Fn(MessageFinish) + Send + Sync + 'static,
    {
        self.on_finish = Some(Arc::new(handler));
        self
    }

    pub fn with_on_step_finish<F>(mut self, handler: F) -> Self
    where
        F: Fn(MessageFinish) + Send + Sync + 'static,
    {
        self.on_step_finish = Some(Arc::new(handler));
        self
    }

    /// The assistant message this stream continues, if any.
    fn continued(&self) -> Option<&UiMessage> {
        self.original_messages
            .last()
            .filter(|message| message.role == Role::Assistant)
    }
}

/// Fold state that reports the response message exactly once, including
/// when the stream is dropped before it ends.
struct FinishTracker {
    state: MessageState,
    config: ReducerConfig,
    original_messages: Vec<UiMessage>,
    is_continuation: bool,
    is_aborted: bool,
    on_finish: Option<MessageFinishHandler>,
    on_step_finish: Option<MessageFinishHandler>,
}

impl FinishTracker {
    fn observe(&mut self, chunk: &UiChunk) {
        if matches!(chunk, UiChunk::Abort { .. }) {
            self.is_aborted = true;
        }
        self.state.apply(chunk, &self.config);
        if matches!(chunk, UiChunk::FinishStep)
            && let Some(handler) = &self.on_step_finish
        {
            handler(self.snapshot());
        }
    }

    fn snapshot(&self) -> MessageFinish {
        let response_message = self.state.message().clone();
        let mut messages = self.original_messages.clone();
        if self.is_continuation {
            messages.pop();
        }
        messages.push(response_message.clone());
        MessageFinish {
            messages,
            response_message,
            is_continuation: self.is_continuation,
            is_aborted: self.is_aborted,
        }
    }
}

impl Drop for FinishTracker {
    fn drop(&mut self) {
        if let Some(handler) = self.on_finish.take() {
            let finish = self.snapshot();
            tracing::debug!(
                message_id = %finish.response_message.id,
                continuation = finish.is_continuation,
                aborted = finish.is_aborted,
                "response message finished"
            );
            handler(finish);
        }
    }
}

fn inject_message_id(chunk: UiChunk, message_id: Option<&String>) -> UiChunk {
    match (chunk, message_id) {
        (
            UiChunk::Start {
                message_id: None,
                message_metadata,
            },
            Some(id),
        ) => UiChunk::Start {
            message_id: Some(id.clone()),
            message_metadata,
        },
        (chunk, _) => chunk,
    }
}

/// Forward `stream` unchanged except for the `start` message id, and report
/// the response message to the finish handlers.
///
/// Without handlers the stream is only passed through.
pub fn handle_message_finish<S>(stream: S, options: ResponseMessageOptions) -> UiChunkStream
where
    S: Stream<Item = UiChunk> + Send + 'static,
{
    let continued = options.continued().cloned();
    let message_id = continued
        .as_ref()
        .map(|message| message.id.clone())
        .or(options.message_id);

    if options.on_finish.is_none() && options.on_step_finish.is_none() {
        return Box::pin(stream.map(move |chunk| inject_message_id(chunk, message_id.as_ref())));
    }

    let is_continuation = continued.is_some();
    let seed = continued
        .unwrap_or_else(|| UiMessage::assistant(message_id.clone().unwrap_or_default()));
    let mut tracker = FinishTracker {
        state: MessageState::new(seed),
        config: options.reducer,
        original_messages: options.original_messages,
        is_continuation,
        is_aborted: false,
        on_finish: options.on_finish,
        on_step_finish: options.on_step_finish,
    };

    let out = async_stream::stream! {
        let mut stream = Box::pin(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = inject_message_id(chunk, message_id.as_ref());
            tracker.observe(&chunk);
            yield chunk;
        }
        drop(tracker);
    };
    Box::pin(out)
}
