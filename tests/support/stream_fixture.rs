//! Test fixture utilities: load recorded wire bodies and decode them

use futures_util::StreamExt;
use std::io;

use ui_message_stream::streaming::{WireFormat, decode_byte_stream};
use ui_message_stream::types::UiChunk;

pub fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

/// Load a fixture body and cut it into reads of `read_size` bytes, the way a
/// socket would deliver it.
pub fn load_fixture_as_reads(name: &str, read_size: usize) -> io::Result<Vec<Result<Vec<u8>, io::Error>>> {
    let raw = std::fs::read(fixture_path(name))?;
    Ok(raw
        .chunks(read_size.max(1))
        .map(|read| Ok(read.to_vec()))
        .collect())
}

/// Decode a fixture, panicking on transport errors.
pub async fn decode_fixture(name: &str, format: WireFormat, read_size: usize) -> Vec<UiChunk> {
    let reads = load_fixture_as_reads(name, read_size).expect("fixture exists");
    decode_byte_stream(futures_util::stream::iter(reads), format)
        .map(|item| item.expect("no transport error"))
        .collect()
        .await
}
