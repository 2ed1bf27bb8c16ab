//! Stream decoder
//!
//! Byte stream to chunk stream, for either framing. Recoverable parse errors
//! are logged and skipped; the `[DONE]` sentinel ends the stream cleanly.
//! A transport error, or a body that ends before the sentinel, ends it with
//! one `Err` item.

use futures_util::{Stream, StreamExt};

use super::{ChunkStream, DONE_SENTINEL, LineDecoder, WireFormat, WireRecord, decode_sse_data};
use crate::error::{ParseError, StreamError};

/// What the decode loop should do with one record.
enum Step {
    Yield(crate::types::UiChunk),
    Skip,
    Stop,
}

fn truncated() -> StreamError {
    tracing::warn!("byte stream ended without sentinel");
    StreamError::transport(format!("stream ended before {DONE_SENTINEL}"))
}

fn classify(record: Result<WireRecord, ParseError>) -> Step {
    match record {
        Ok(WireRecord::Chunk(chunk)) => Step::Yield(chunk),
        Ok(WireRecord::Done) => Step::Stop,
        Err(e) => {
            tracing::warn!(error = %e, "skipping undecodable stream record");
            Step::Skip
        }
    }
}

/// Decode a byte stream in the given framing.
pub fn decode_byte_stream<S, B, E>(byte_stream: S, format: WireFormat) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    match format {
        WireFormat::Lines => decode_line_stream(byte_stream),
        WireFormat::Sse => decode_sse_stream(byte_stream),
    }
}

fn decode_line_stream<S, B, E>(byte_stream: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let out = async_stream::stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut decoder = LineDecoder::new();

        while let Some(item) = byte_stream.next().await {
            let bytes = match item {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(StreamError::transport(format!("stream read failed: {e}")));
                    return;
                }
            };
            for record in decoder.push(bytes.as_ref()) {
                match classify(record) {
                    Step::Yield(chunk) => yield Ok(chunk),
                    Step::Skip => {}
                    Step::Stop => return,
                }
            }
        }

        if let Some(record) = decoder.finish() {
            match classify(record) {
                Step::Yield(chunk) => yield Ok(chunk),
                Step::Skip => {}
                Step::Stop => return,
            }
        }
        yield Err(truncated());
    };
    Box::pin(out)
}

fn decode_sse_stream<S, B, E>(byte_stream: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    use eventsource_stream::Eventsource;

    let out = async_stream::stream! {
        let mut events = Box::pin(byte_stream.eventsource());

        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    yield Err(StreamError::transport(format!("SSE stream error: {e}")));
                    return;
                }
            };
            if event.data.trim().is_empty() {
                continue;
            }
            match classify(decode_sse_data(&event.data)) {
                Step::Yield(chunk) => yield Ok(chunk),
                Step::Skip => {}
                Step::Stop => return,
            }
        }
        yield Err(truncated());
    };
    Box::pin(out)
}
