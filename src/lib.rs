//! # ui-message-stream
//!
//! Streaming plumbing between an LLM producer and a chat UI.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Chunk protocol**: a typed union of stream events (`UiChunk`) with a
//!   line-based wire codec and SSE framing.
//! - **Stream forwarder**: merges producer output, tool results and custom
//!   data into one ordered stream with backpressure, cancellation and
//!   error-to-chunk conversion.
//! - **Incremental reducer**: folds chunks into a renderable `UiMessage`
//!   that is valid after every chunk, including after failures.
//! - **Resumable sessions**: an append-only chunk log per session so a
//!   disconnected client can replay and follow the live tail.
//! - **HTTP surface**: an Axum response adapter (`server-adapters` feature)
//!   and a `reqwest` response decoder.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ui_message_stream::prelude::*;
//!
//! let handle = create_ui_message_stream(ForwarderConfig::default(), |writer| async move {
//!     writer.write(UiChunk::start()).await?;
//!     writer.write(UiChunk::text_start("t1")).await?;
//!     writer.write(UiChunk::text_delta("t1", "Hello")).await?;
//!     writer.write(UiChunk::text_end("t1")).await?;
//!     writer.write(UiChunk::finish()).await
//! });
//!
//! let mut messages = read_ui_message_stream(handle.stream, ReducerConfig::default());
//! while let Some(message) = messages.next().await {
//!     render(&message);
//! }
//! ```

pub mod client;
pub mod error;
pub mod observability;
pub mod prelude;
pub mod reducer;
pub mod server_adapters;
pub mod session;
pub mod streaming;
pub mod types;
pub mod utils;

pub use error::{ErrorCategory, ParseError, Result, SessionError, StreamError};
pub use reducer::{MessageReducer, MessageState, ReducerConfig, read_ui_message_stream, reduce};
pub use server_adapters::StreamResponseOptions;
pub use session::{ChunkStore, InMemoryChunkStore, ResumableStreams, SessionConfig};
pub use streaming::{
    ForwarderConfig, StreamForwarder, UiMessageStreamWriter, WireFormat, create_ui_message_stream,
};
pub use types::{UiChunk, UiMessage, UiPart};
