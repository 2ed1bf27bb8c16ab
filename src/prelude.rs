//! Convenient re-exports for common usage
//!
//! ```rust,ignore
//! use ui_message_stream::prelude::*;
//! ```

pub use crate::error::{ErrorCategory, Result, SessionError, StreamError};
pub use crate::reducer::{
    DataPartReducer, MessageFinish, MessageReducer, MessageState, PartChange, ReducerConfig,
    ResponseMessageOptions, create_reducer, handle_message_finish, read_ui_message_stream,
    reduce,
};
pub use crate::server_adapters::StreamResponseOptions;
pub use crate::session::{ChunkStore, InMemoryChunkStore, ResumableStreams, SessionConfig};
pub use crate::streaming::{
    ChunkStream, ForwarderConfig, StreamForwarder, UiChunkStream, UiMessageStreamWriter,
    WireFormat, create_ui_message_stream, merge,
};
pub use crate::types::{MessageStatus, ToolState, UiChunk, UiMessage, UiPart};
pub use crate::utils::CancelHandle;

pub use futures::{Stream, StreamExt};
