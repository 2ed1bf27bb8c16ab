//! Utility helpers shared across modules

pub mod cancel;
pub mod id;

pub use cancel::{CancelHandle, make_cancellable_stream};
pub use id::generate_id;
