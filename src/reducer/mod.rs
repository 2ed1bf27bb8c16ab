//! Incremental Message Reducer
//!
//! Folds an ordered chunk sequence into a `UiMessage` that can be rendered at
//! any point: mid-stream, after a reconnect replay, or after a failure.
//!
//! - [`MessageState`] is the pure fold: `apply(chunk, config) -> PartChange`.
//! - [`MessageReducer`] wraps it with a change callback for UI bindings.
//! - [`read_ui_message_stream`] turns a chunk stream into message snapshots.
//! - [`handle_message_finish`] reports the response message of an outgoing
//!   stream once it ends.
//!
//! Malformed or out-of-order chunks never panic and never error out of the
//! fold; they are recorded as [`Anomaly`] values and logged.

mod config;
mod data;
mod finish;
mod metadata;
mod partial_json;
mod state;
mod tool;

pub use config::{
    AppendItems, DataHandler, DataPartReducer, MergeObjects, MetadataSchema, ReducerConfig,
    ReplaceLatest,
};
pub use finish::{
    MessageFinish, MessageFinishHandler, ResponseMessageOptions, handle_message_finish,
};
pub use metadata::deep_merge;
pub use partial_json::parse_partial_json;
pub use state::{Anomaly, MessageState, PartChange, Severity};

use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::types::{UiChunk, UiMessage};

/// Callback invoked after every chunk that changed the message.
pub type ChangeHandler = Box<dyn FnMut(&UiMessage, PartChange) + Send>;

/// Stateful consumer of a chunk stream.
pub struct MessageReducer {
    state: MessageState,
    config: ReducerConfig,
    on_change: Option<ChangeHandler>,
}

impl std::fmt::Debug for MessageReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageReducer")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("has_on_change", &self.on_change.is_some())
            .finish()
    }
}

impl Default for MessageReducer {
    fn default() -> Self {
        Self::new(ReducerConfig::default())
    }
}

impl MessageReducer {
    pub fn new(config: ReducerConfig) -> Self {
        Self::from_state(MessageState::default(), config)
    }

    /// Continue folding from an existing state, e.g. a snapshot taken before
    /// a reconnect.
    pub fn from_state(state: MessageState, config: ReducerConfig) -> Self {
        Self {
            state,
            config,
            on_change: None,
        }
    }

    /// Start from an existing message (for example a persisted assistant
    /// message that a resumed stream keeps appending to).
    pub fn for_message(message: UiMessage, config: ReducerConfig) -> Self {
        Self::from_state(MessageState::new(message), config)
    }

    pub fn on_change<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&UiMessage, PartChange) + Send + 'static,
    {
        self.on_change = Some(Box::new(handler));
        self
    }

    /// Apply one chunk and notify the change handler.
    pub fn feed(&mut self, chunk: &UiChunk) -> PartChange {
        let change = self.state.apply(chunk, &self.config);
        if !change.is_none()
            && let Some(handler) = &mut self.on_change
        {
            handler(self.state.message(), change);
        }
        change
    }

    pub fn feed_all<'a, I>(&mut self, chunks: I)
    where
        I: IntoIterator<Item = &'a UiChunk>,
    {
        for chunk in chunks {
            self.feed(chunk);
        }
    }

    pub fn message(&self) -> &UiMessage {
        self.state.message()
    }

    pub fn state(&self) -> &MessageState {
        &self.state
    }

    pub fn config(&self) -> &ReducerConfig {
        &self.config
    }

    pub fn into_message(self) -> UiMessage {
        self.state.into_message()
    }

    pub fn into_state(self) -> MessageState {
        self.state
    }
}

/// Reducer with default configuration and a change callback.
pub fn create_reducer<F>(on_change: F) -> MessageReducer
where
    F: FnMut(&UiMessage, PartChange) + Send + 'static,
{
    MessageReducer::default().on_change(on_change)
}

/// Fold a complete chunk sequence.
pub fn reduce<'a, I>(chunks: I, config: &ReducerConfig) -> MessageState
where
    I: IntoIterator<Item = &'a UiChunk>,
{
    let mut state = MessageState::default();
    for chunk in chunks {
        state.apply(chunk, config);
    }
    state
}

/// Message snapshot stream.
pub type UiMessageStream = Pin<Box<dyn Stream<Item = UiMessage> + Send>>;

/// Yield a snapshot of the message after every chunk that changed it.
///
/// Forwarder output can be passed directly; a fallible decoded stream can be
/// routed through `streaming::merge` first so failures become `error` chunks.
pub fn read_ui_message_stream<S>(stream: S, config: ReducerConfig) -> UiMessageStream
where
    S: Stream<Item = UiChunk> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut stream = Box::pin(stream);
        let mut state = MessageState::default();
        while let Some(chunk) = stream.next().await {
            if !state.apply(&chunk, &config).is_none() {
                yield state.message().clone();
            }
        }
    };
    Box::pin(out)
}
