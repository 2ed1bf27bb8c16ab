//! Cancellation utilities
//!
//! One abort signal shared by a forwarder, its writer and any wrapped stream.

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::streaming::UiChunkStream;
use crate::types::UiChunk;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Streams observing this handle drop their
    /// sources, which releases upstream connections.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// A handle that is cancelled together with this one but can also be
    /// cancelled on its own.
    pub fn child(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.child_token(),
        }
    }

    /// Cancels once `signal` resolves, unless cancelled earlier.
    ///
    /// Timeouts are expressed through this: pass a `tokio::time::sleep` and
    /// spawn or select on the returned future.
    pub fn cancel_on<F>(&self, signal: F) -> impl Future<Output = ()> + Send + 'static
    where
        F: Future + Send + 'static,
    {
        let token = self.token.clone();
        async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = signal => token.cancel(),
            }
        }
    }
}

/// Make a chunk stream cancellable and return its cancel handle.
///
/// On cancellation the inner stream is dropped and a single `abort` chunk
/// closes the output.
pub fn make_cancellable_stream(stream: UiChunkStream) -> (UiChunkStream, CancelHandle) {
    let handle = CancelHandle::new();
    let token = handle.token.clone();
    let mut inner = stream;
    let s = async_stream::stream! {
        use futures::StreamExt;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    yield UiChunk::abort();
                    break;
                }
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
    };
    (Box::pin(s), handle)
}
