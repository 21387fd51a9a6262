//! Ambient cancellation context threaded through every blocking operation.
//!
//! Per the concurrency model, every suspension point (rate-limiter rejection,
//! HTTP round-trip, backoff sleep, single-flight wait, KV round-trip) must
//! accept a context whose cancellation aborts the wait promptly, without
//! cancelling work shared with other callers. [`CancellationToken`] already
//! gives us that distinction for free: cloning a token and cancelling the
//! clone never cancels the parent, but cancelling the parent propagates to
//! every clone and child.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A cancellable, cloneable handle passed down the call stack.
///
/// Cloning a `Context` does not create independent cancellation: all clones
/// of the same `Context` observe the same cancellation. Use [`Context::child`]
/// when you need a scope that can be cancelled independently (e.g. a single
/// arriver's wait on a single-flight leader) without affecting the parent.
#[derive(Clone, Debug)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    /// A context that is never cancelled on its own; only tied to
    /// process shutdown if the caller cancels it explicitly.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Wraps an existing token, e.g. the process-wide shutdown token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A child context: cancelling the child does not cancel `self`, but
    /// cancelling `self` cancels every child transitively.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Cancels this context and everything derived from it via [`Context::child`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True if this context (or an ancestor) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Races `fut` against cancellation, returning `None` if cancelled first.
    pub async fn race<F, T>(&self, fut: F) -> Option<T>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Sleeps for `duration`, cancellable. Returns `false` if cancelled
    /// before the duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        self.race(tokio::time::sleep(duration)).await.is_some()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
