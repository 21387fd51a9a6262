//! Key-scoped single-flight coalescing for the tiered cache's loader path.
//!
//! On a cache miss, many concurrent callers for the same key must not all
//! hit the same loader (an upstream fetch, typically) at once — that is
//! exactly the "thundering herd" the tiered cache in `cadence-cache` is
//! built to avoid. [`SingleFlight`] guarantees at most one live loader
//! invocation per key at any instant; every other arriver attaches to that
//! invocation and receives its result.
//!
//! # Cancellation
//!
//! The loader, once started, is detached onto its own task: cancelling the
//! context of the caller that happened to start it does not stop it, since
//! other arrivers may be depending on its result. A cancelled caller — leader
//! or waiter — simply stops waiting and returns its context's cancellation
//! error; the computation keeps running for whoever is still around.
//!
//! # Example
//!
//! ```
//! use cadence_coalesce::SingleFlight;
//! use cadence_core::Context;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sf = Arc::new(SingleFlight::new());
//! let ctx = Context::background();
//!
//! let result = sf
//!     .get_or_load(&ctx, "song:42", || async { Ok(b"bytes".to_vec()) })
//!     .await;
//! assert_eq!(result.unwrap(), b"bytes");
//! # }
//! ```

mod service;

use cadence_core::{Context, GatewayError};
use service::{InFlight, Role};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

#[cfg(feature = "metrics")]
use metrics::counter;

/// A registry of in-flight, key-scoped computations producing `Res`.
///
/// Cheap to construct; typically held behind an `Arc` and shared by every
/// caller of a given tiered cache instance. `Res` defaults to `Vec<u8>` (raw
/// cache bytes); a caller that needs to carry extra metadata through the
/// coalesced result — e.g. whether it was served from a stale reserve — can
/// use a richer `Res`.
pub struct SingleFlight<Res = Vec<u8>> {
    in_flight: InFlight<Res>,
    name: String,
}

impl<Res: Clone + Send + 'static> SingleFlight<Res> {
    /// Creates an unnamed registry.
    pub fn new() -> Self {
        Self {
            in_flight: InFlight::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Creates a registry whose events/metrics are labeled `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            in_flight: InFlight::new(),
            name: name.into(),
        }
    }

    /// Runs `loader` for `key`, coalescing with any computation already in
    /// flight for that key.
    ///
    /// If this call is the first for `key`, it becomes the leader: `loader`
    /// is spawned onto its own task (so cancelling `ctx` later does not
    /// abort it) and its result is broadcast to every arriver, including
    /// this one. If a computation is already running, this call waits for
    /// it instead of invoking `loader` at all.
    ///
    /// `ctx` governs only this call's own wait; it never cancels the shared
    /// computation. Returns `ctx`'s cancellation error if `ctx` cancels
    /// before a result is available.
    pub async fn get_or_load<F, Fut>(
        self: &Arc<Self>,
        ctx: &Context,
        key: &str,
        loader: F,
    ) -> Result<Res, GatewayError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Res, GatewayError>> + Send + 'static,
    {
        let (role, mut receiver) = self.in_flight.join(key);

        if matches!(role, Role::Leader) {
            #[cfg(feature = "metrics")]
            counter!("coalesce_leader_total", "group" => self.name.clone()).increment(1);

            let registry = Arc::clone(self);
            let key_owned = key.to_string();
            tokio::spawn(async move {
                let result = loader().await;
                registry.in_flight.complete(&key_owned, result);
            });
        } else {
            #[cfg(feature = "metrics")]
            counter!("coalesce_waiter_total", "group" => self.name.clone()).increment(1);
        }

        match ctx.race(receiver.recv()).await {
            None => Err(GatewayError::ContextCancelled),
            Some(Ok(result)) => result,
            Some(Err(broadcast::error::RecvError::Closed)) => Err(GatewayError::StoreFault(
                "single-flight computation ended without a result".to_string(),
            )),
            Some(Err(broadcast::error::RecvError::Lagged(_))) => Err(GatewayError::StoreFault(
                "single-flight result was missed".to_string(),
            )),
        }
    }
}

impl<Res: Clone + Send + 'static> Default for SingleFlight<Res> {
    fn default() -> Self {
        Self::new()
    }
}
