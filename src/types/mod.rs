//! Core data types: the wire chunk union and the renderable message model.

mod chunk;
mod message;

pub use chunk::*;
pub use message::*;

/// Provider metadata object keyed by provider name.
///
/// Kept permissive so metadata emitted by newer producers survives a round trip.
pub type ProviderMetadata = serde_json::Map<String, serde_json::Value>;
