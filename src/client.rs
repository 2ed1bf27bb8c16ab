//! HTTP client side
//!
//! Opens a chunk stream from a `reqwest::Response`. A non-2xx status is a
//! rejected open and surfaces as an error before any chunk; once the body
//! starts, failures arrive as items of the stream.

use crate::error::StreamError;
use crate::streaming::{ChunkStream, PROTOCOL_HEADER, PROTOCOL_VERSION, WireFormat, decode_byte_stream};

/// Framing announced by the response's `content-type`, `Lines` if absent.
pub fn detect_format(response: &reqwest::Response) -> WireFormat {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(WireFormat::from_content_type)
        .unwrap_or_default()
}

/// Decode the body of `response` into chunks.
pub async fn open_chunk_stream(
    response: reqwest::Response,
    format: WireFormat,
) -> Result<ChunkStream, StreamError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "chunk stream rejected");
        return Err(StreamError::transport_status(status.as_u16(), error_text));
    }

    if let Some(version) = response.headers().get(PROTOCOL_HEADER) {
        let version = version.to_str().unwrap_or_default();
        if version != PROTOCOL_VERSION {
            tracing::warn!(
                version,
                expected = PROTOCOL_VERSION,
                "protocol version mismatch, unknown chunk types will be skipped"
            );
        }
    }

    tracing::debug!(?format, "chunk stream opened");
    Ok(decode_byte_stream(response.bytes_stream(), format))
}
