//! Axum-specific server adapters
//!
//! ## Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::post};
//! use ui_message_stream::server_adapters::{axum::to_stream_response, StreamResponseOptions};
//! use ui_message_stream::streaming::{create_ui_message_stream, ForwarderConfig};
//! use ui_message_stream::types::UiChunk;
//!
//! async fn chat_handler() -> axum::response::Response {
//!     let handle = create_ui_message_stream(ForwarderConfig::default(), |writer| async move {
//!         writer.write(UiChunk::start()).await?;
//!         writer.write(UiChunk::finish()).await
//!     });
//!     to_stream_response(handle.stream, StreamResponseOptions::production())
//! }
//!
//! let app: Router = Router::new().route("/chat", post(chat_handler));
//! ```

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

use crate::server_adapters::{StreamResponseOptions, encode_body, response_headers};
use crate::streaming::UiChunkStream;

/// Convert a chunk stream into a streaming Axum response.
///
/// The body is produced lazily: the stream is only polled while the client
/// reads, so a slow client applies backpressure all the way to the sources.
/// Dropping the response (client disconnect) drops the stream.
pub fn to_stream_response(stream: UiChunkStream, opts: StreamResponseOptions) -> Response {
    let body = Body::from_stream(encode_body(stream, &opts));
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    for (name, value) in response_headers(&opts) {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    if opts.format == crate::streaming::WireFormat::Sse {
        headers.insert(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        );
    }

    tracing::debug!(format = ?opts.format, "streaming response started");
    response
}
