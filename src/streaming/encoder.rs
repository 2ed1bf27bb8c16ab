//! Stream encoder
//!
//! Turns a chunk stream into response body bytes in either framing. The
//! `[DONE]` sentinel is appended once the chunk stream ends.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use super::{ByteStream, WireFormat};
use crate::types::UiChunk;

/// Encode a chunk stream for an HTTP body.
///
/// A chunk that fails to serialize is reported as an `Err` item and the
/// stream continues with the next chunk.
pub fn encode_chunk_stream<S>(stream: S, format: WireFormat) -> ByteStream
where
    S: Stream<Item = UiChunk> + Send + 'static,
{
    let body = stream
        .map(move |chunk| format.encode(&chunk).map(Bytes::from))
        .chain(futures_util::stream::once(async move {
            Ok(Bytes::from_static(format.done_frame().as_bytes()))
        }));
    Box::pin(body)
}
