use thiserror::Error;

/// Coarse classification used by callers to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or out-of-order chunks.
    Protocol,
    /// Connection drops and non-2xx responses.
    Transport,
    /// Failures reported by the producing side (provider/model/tool runtime).
    Producer,
    /// Session store failures.
    Session,
    /// Caller-initiated cancellation.
    Cancelled,
    /// Invalid configuration.
    Configuration,
}

/// Failure to decode a single wire record.
///
/// Every variant leaves the decoder usable: the offending record is skipped
/// and decoding continues at the next delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The record carried a type code this decoder does not know.
    #[error("unknown chunk type code `{code}`")]
    UnknownType { code: String },
    /// The record did not have the `<code>:<payload>` shape.
    #[error("malformed record: {0}")]
    Malformed(String),
    /// The payload was not valid JSON or did not match the chunk shape.
    #[error("invalid payload for `{code}`: {message}")]
    InvalidPayload { code: String, message: String },
}

impl ParseError {
    /// Whether the decoder may skip the record and continue.
    ///
    /// Unknown type codes come from protocol version skew and are always
    /// skippable; shape errors are skippable because the framing is intact.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ParseError::UnknownType { .. }
            | ParseError::Malformed(_)
            | ParseError::InvalidPayload { .. } => true,
        }
    }
}

/// Errors returned by session stores and the resumable stream front-end.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session `{0}` not found")]
    NotFound(String),
    #[error("session `{0}` already exists")]
    AlreadyExists(String),
    #[error("session `{0}` is complete; append rejected")]
    Completed(String),
    #[error("session `{session_id}` reached its chunk limit ({limit})")]
    CapacityExceeded { session_id: String, limit: usize },
    #[error("session store backend error: {0}")]
    Backend(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

/// Crate-wide error type.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// Wire decoding failed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Chunk sequencing violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport failed before or while streaming.
    #[error("transport error{}: {message}", fmt_status(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// A chunk source failed while producing.
    #[error("source error: {0}")]
    Source(String),

    /// Serializing a chunk failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Session store failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Invalid configuration (e.g. an uncompilable metadata schema).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,
}

impl StreamError {
    /// Creates a transport error carrying an HTTP status.
    pub fn transport_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a transport error without a status (connection level).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a source error.
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Parse(_) | StreamError::Protocol(_) | StreamError::Serialization(_) => {
                ErrorCategory::Protocol
            }
            StreamError::Transport { .. } => ErrorCategory::Transport,
            StreamError::Source(_) => ErrorCategory::Producer,
            StreamError::Session(_) => ErrorCategory::Session,
            StreamError::Configuration(_) => ErrorCategory::Configuration,
            StreamError::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Whether reconnecting (and resuming from the last cursor) may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { status: None, .. } => true,
            StreamError::Transport {
                status: Some(code), ..
            } => *code == 408 || *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Message suitable for end users (no internal detail for protocol bugs).
    pub fn user_message(&self) -> String {
        match self {
            StreamError::Parse(_) | StreamError::Protocol(_) | StreamError::Serialization(_) => {
                "the response stream was malformed".to_string()
            }
            StreamError::Transport { .. } => "the connection to the server was lost".to_string(),
            StreamError::Source(message) => message.clone(),
            StreamError::Session(_) => "the stream session is unavailable".to_string(),
            StreamError::Configuration(_) => "invalid stream configuration".to_string(),
            StreamError::Cancelled => "the stream was cancelled".to_string(),
        }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Serialization(err.to_string())
    }
}
