//! Wire codec
//!
//! Two framings share the same chunk shapes:
//!
//! - **Lines**: one self-delimiting record per line, `<code>:<payload>\n`,
//!   where `<code>` is a two character type code and `<payload>` is the
//!   chunk's JSON object without its `type` field. `raw` records carry the
//!   raw value itself.
//! - **SSE**: `data: <chunk json>\n\n`, where the payload is the full tagged
//!   chunk object.
//!
//! Both framings end with the `[DONE]` sentinel, which closes the transport
//! and is distinct from the logical `finish` chunk.

use serde_json::{Map, Value};

use crate::error::{ParseError, StreamError};
use crate::types::UiChunk;

/// Response header announcing the chunk protocol.
pub const PROTOCOL_HEADER: &str = "x-ui-message-stream";
/// Current protocol version, sent as the value of [`PROTOCOL_HEADER`].
pub const PROTOCOL_VERSION: &str = "v1";
/// Transport-level end marker.
pub const DONE_SENTINEL: &str = "[DONE]";

/// (code, type) pairs. Codes are stable across protocol versions; new chunk
/// types get new codes so old decoders can skip them.
const TYPE_CODES: &[(&str, &str)] = &[
    ("ms", "start"),
    ("ss", "start-step"),
    ("fs", "finish-step"),
    ("mf", "finish"),
    ("er", "error"),
    ("ab", "abort"),
    ("t0", "text-start"),
    ("t1", "text-delta"),
    ("t2", "text-end"),
    ("r0", "reasoning-start"),
    ("r1", "reasoning-delta"),
    ("r2", "reasoning-end"),
    ("i0", "tool-input-start"),
    ("i1", "tool-input-delta"),
    ("i2", "tool-input-end"),
    ("tc", "tool-call"),
    ("tr", "tool-result"),
    ("te", "tool-error"),
    ("aq", "tool-approval-request"),
    ("ar", "tool-approval-response"),
    ("td", "tool-output-denied"),
    ("fi", "file"),
    ("so", "source"),
    ("da", "data"),
    ("mm", "message-metadata"),
    ("rw", "raw"),
];

/// Two character code for a chunk type.
pub fn code_for_kind(kind: &str) -> Option<&'static str> {
    TYPE_CODES
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(code, _)| *code)
}

/// Chunk type for a two character code.
pub fn kind_for_code(code: &str) -> Option<&'static str> {
    TYPE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, kind)| *kind)
}

fn is_known_kind(kind: &str) -> bool {
    TYPE_CODES.iter().any(|(_, k)| *k == kind)
}

/// Framing used on the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// `<code>:<payload>\n` records
    #[default]
    Lines,
    /// Server-sent events with full chunk JSON in `data:`
    Sse,
}

impl WireFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Lines => "text/plain; charset=utf-8",
            WireFormat::Sse => "text/event-stream",
        }
    }

    /// Framing announced by a `content-type` header value.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("text/event-stream")
        {
            WireFormat::Sse
        } else {
            WireFormat::Lines
        }
    }

    /// Encoded end-of-transport marker for this framing.
    pub fn done_frame(self) -> &'static str {
        match self {
            WireFormat::Lines => "[DONE]\n",
            WireFormat::Sse => "data: [DONE]\n\n",
        }
    }

    /// Encode one chunk in this framing.
    pub fn encode(self, chunk: &UiChunk) -> Result<String, StreamError> {
        match self {
            WireFormat::Lines => encode(chunk),
            WireFormat::Sse => encode_sse(chunk),
        }
    }
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq)]
pub enum WireRecord {
    Chunk(UiChunk),
    /// The `[DONE]` sentinel
    Done,
}

/// Encode a chunk as one newline-delimited record.
pub fn encode(chunk: &UiChunk) -> Result<String, StreamError> {
    let kind = chunk.kind();
    let code = code_for_kind(kind)
        .ok_or_else(|| StreamError::Serialization(format!("no wire code for `{kind}`")))?;

    let payload = match chunk {
        UiChunk::Raw { raw_value } => serde_json::to_string(raw_value)?,
        _ => {
            let mut value = serde_json::to_value(chunk)?;
            if let Some(object) = value.as_object_mut() {
                object.remove("type");
            }
            serde_json::to_string(&value)?
        }
    };

    Ok(format!("{code}:{payload}\n"))
}

/// Encode a chunk as one SSE event.
pub fn encode_sse(chunk: &UiChunk) -> Result<String, StreamError> {
    let json = serde_json::to_string(chunk)?;
    Ok(format!("data: {json}\n\n"))
}

/// Decode one newline-delimited record. The trailing newline is optional.
pub fn decode(record: &str) -> Result<WireRecord, ParseError> {
    let line = record.trim_end_matches(['\n', '\r']);
    if line.trim() == DONE_SENTINEL {
        return Ok(WireRecord::Done);
    }

    let (code, payload) = line
        .split_once(':')
        .ok_or_else(|| ParseError::Malformed(format!("missing type code in `{}`", preview(line))))?;

    let kind = kind_for_code(code).ok_or_else(|| ParseError::UnknownType {
        code: code.to_string(),
    })?;

    let value: Value = serde_json::from_str(payload).map_err(|e| ParseError::InvalidPayload {
        code: code.to_string(),
        message: e.to_string(),
    })?;

    if kind == "raw" {
        return Ok(WireRecord::Chunk(UiChunk::Raw { raw_value: value }));
    }

    let mut object = match value {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => {
            return Err(ParseError::InvalidPayload {
                code: code.to_string(),
                message: format!("expected an object, got `{}`", preview(&other.to_string())),
            });
        }
    };
    object.insert("type".to_string(), Value::String(kind.to_string()));

    serde_json::from_value(Value::Object(object))
        .map(WireRecord::Chunk)
        .map_err(|e| ParseError::InvalidPayload {
            code: code.to_string(),
            message: e.to_string(),
        })
}

/// Decode the `data` field of one SSE event.
pub fn decode_sse_data(data: &str) -> Result<WireRecord, ParseError> {
    let data = data.trim();
    if data == DONE_SENTINEL {
        return Ok(WireRecord::Done);
    }

    let value: Value = serde_json::from_str(data).map_err(|e| ParseError::InvalidPayload {
        code: "sse".to_string(),
        message: e.to_string(),
    })?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::Malformed("SSE payload has no `type`".to_string()))?;
    if !is_known_kind(kind) {
        return Err(ParseError::UnknownType {
            code: kind.to_string(),
        });
    }
    let kind = kind.to_string();

    serde_json::from_value(value)
        .map(WireRecord::Chunk)
        .map_err(|e| ParseError::InvalidPayload {
            code: kind,
            message: e.to_string(),
        })
}

fn preview(text: &str) -> String {
    const MAX: usize = 64;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Default cap on one lines record, in bytes.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 4 * 1024 * 1024;

/// Incremental decoder for the lines framing.
///
/// Bytes are buffered until a newline arrives, so records (and multi-byte
/// UTF-8 sequences) split across network reads are reassembled. A bad record
/// costs only itself: decoding resumes after its newline. A record longer
/// than the configured maximum is reported once as malformed and its bytes
/// are dropped up to the next newline.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for a newline
    scanned: usize,
    max_record_bytes: usize,
    /// Dropping the tail of an oversized record
    discarding: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            discarding: false,
        }
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_record_bytes(mut self, max: usize) -> Self {
        self.max_record_bytes = max.max(1);
        self
    }

    pub fn max_record_bytes(&self) -> usize {
        self.max_record_bytes
    }

    /// Feed bytes and return every record completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<WireRecord, ParseError>> {
        self.buffer.extend_from_slice(bytes);

        let mut records = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            if self.discarding {
                self.discarding = false;
            } else if end - start > self.max_record_bytes {
                records.push(Err(self.oversized()));
            } else if let Some(record) = Self::decode_line(&self.buffer[start..=end]) {
                records.push(record);
            }
            start = end + 1;
            self.scanned = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_record_bytes {
            if !self.discarding {
                records.push(Err(self.oversized()));
                self.discarding = true;
            }
            self.buffer.clear();
            self.scanned = 0;
        }
        records
    }

    /// Decode whatever is left once the byte stream ended without a final
    /// newline.
    pub fn finish(&mut self) -> Option<Result<WireRecord, ParseError>> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        Self::decode_line(&rest)
    }

    /// Bytes buffered waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn oversized(&self) -> ParseError {
        ParseError::Malformed(format!(
            "record exceeds {} bytes",
            self.max_record_bytes
        ))
    }

    fn decode_line(line: &[u8]) -> Option<Result<WireRecord, ParseError>> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text,
            Err(e) => return Some(Err(ParseError::Malformed(format!("invalid UTF-8: {e}")))),
        };
        if text.trim().is_empty() {
            return None;
        }
        Some(decode(text))
    }
}
