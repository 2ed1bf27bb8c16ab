//! Error Handling Module
//!
//! Error types shared by the chunk codec, the stream forwarder, the message
//! reducer and the resumable session store:
//! - `StreamError`: crate-wide error with a coarse `ErrorCategory`
//! - `ParseError`: wire record decoding failures (mostly recoverable)
//! - `SessionError`: session store failures
//!
//! # Example
//!
//! ```rust,ignore
//! use ui_message_stream::error::{ErrorCategory, StreamError};
//!
//! let error = StreamError::transport_status(503, "upstream unavailable");
//! assert_eq!(error.category(), ErrorCategory::Transport);
//! assert!(error.is_retryable());
//! ```

mod types;

pub use types::*;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, StreamError>;
