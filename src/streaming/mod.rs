//! Streaming Module
//!
//! Everything between a chunk producer and the network:
//! - Stream type aliases
//! - Wire codec (newline-delimited records and SSE framing)
//! - Byte stream encoder/decoder
//! - Stream forwarder (multiplexing, backpressure, cancellation)
//! - Imperative writer for `create_ui_message_stream`

mod codec;
mod decoder;
mod encoder;
mod forwarder;
mod types;
mod writer;

pub use codec::*;
pub use decoder::*;
pub use encoder::*;
pub use forwarder::*;
pub use types::*;
pub use writer::*;
