//! Server adapters: serve a `UiChunkStream` from a web framework
//!
//! The framework-agnostic half lives here: response options, error masking
//! and the encoded body. Framework integrations sit in submodules.
//!
//! ## Features
//!
//! - **Framework-agnostic helpers**: `encode_body()`, `response_headers()`
//! - **Axum integration**: `axum::to_stream_response()` (requires `server-adapters` feature)
//! - **Error masking**: `error` chunk text replaced in production
//!
//! ## Example (Axum)
//!
//! ```rust,ignore
//! use ui_message_stream::server_adapters::{axum::to_stream_response, StreamResponseOptions};
//!
//! async fn chat_handler() -> axum::response::Response {
//!     let handle = build_chat_stream();
//!     to_stream_response(handle.stream, StreamResponseOptions::production())
//! }
//! ```

use futures::StreamExt;

use crate::streaming::{
    ByteStream, PROTOCOL_HEADER, PROTOCOL_VERSION, UiChunkStream, WireFormat, encode_chunk_stream,
};
use crate::types::UiChunk;

#[cfg(feature = "server-adapters")]
pub mod axum;

const DEFAULT_MASKED_ERROR: &str = "An error occurred.";

/// Options for serving a chunk stream.
#[derive(Debug, Clone)]
pub struct StreamResponseOptions {
    /// Wire framing of the body.
    ///
    /// Default: `WireFormat::Lines`
    pub format: WireFormat,

    /// Whether to replace the text of `error` chunks.
    ///
    /// Tool errors are left alone; they belong to the conversation.
    /// Default: `true`
    pub mask_errors: bool,

    /// Replacement text used when `mask_errors` is `true`.
    ///
    /// If `None`, uses "An error occurred.".
    pub masked_error_message: Option<String>,

    /// Whether `raw` passthrough chunks are sent to the client.
    ///
    /// Default: `false`
    pub include_raw: bool,
}

impl Default for StreamResponseOptions {
    fn default() -> Self {
        Self {
            format: WireFormat::Lines,
            mask_errors: true,
            masked_error_message: None,
            include_raw: false,
        }
    }
}

impl StreamResponseOptions {
    /// Everything passes through unmasked.
    pub fn development() -> Self {
        Self {
            mask_errors: false,
            include_raw: true,
            ..Default::default()
        }
    }

    /// Errors masked, raw chunks dropped.
    pub fn production() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_masked_error_message(mut self, message: impl Into<String>) -> Self {
        self.masked_error_message = Some(message.into());
        self.mask_errors = true;
        self
    }

    fn masked_text(&self) -> String {
        self.masked_error_message
            .clone()
            .unwrap_or_else(|| DEFAULT_MASKED_ERROR.to_string())
    }

    /// Apply masking and filtering to one outgoing chunk.
    pub fn prepare(&self, chunk: UiChunk) -> Option<UiChunk> {
        match chunk {
            UiChunk::Raw { .. } if !self.include_raw => None,
            UiChunk::Error { .. } if self.mask_errors => Some(UiChunk::error(self.masked_text())),
            other => Some(other),
        }
    }
}

/// Headers every stream response carries.
pub fn response_headers(opts: &StreamResponseOptions) -> [(&'static str, &'static str); 3] {
    [
        ("content-type", opts.format.content_type()),
        ("cache-control", "no-cache"),
        (PROTOCOL_HEADER, PROTOCOL_VERSION),
    ]
}

/// Encode `stream` into response body bytes, done frame included.
pub fn encode_body(stream: UiChunkStream, opts: &StreamResponseOptions) -> ByteStream {
    let format = opts.format;
    let opts = opts.clone();
    let prepared = stream.filter_map(move |chunk| futures::future::ready(opts.prepare(chunk)));
    encode_chunk_stream(prepared, format)
}
