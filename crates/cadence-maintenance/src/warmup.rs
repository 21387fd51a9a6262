//! Scheduled cache warm-up: seed a fixed set of keys at startup and on a
//! repeating interval, so a cold restart doesn't present every key as a
//! miss to the first wave of callers.

use cadence_cache::TieredCache;
use cadence_core::{Context, GatewayError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

type Producer = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<Vec<u8>, GatewayError>> + Send>> + Send + Sync>;

/// One key to keep warm. `producer` is invoked fresh on every warm-up pass
/// — the same entry can be re-seeded from a literal or refetched through
/// the upstream pipeline, the caller decides which by what it closes over.
#[derive(Clone)]
pub struct WarmupEntry {
    pub key: String,
    pub ttl: Duration,
    producer: Producer,
}

impl WarmupEntry {
    pub fn new<F, Fut>(key: impl Into<String>, ttl: Duration, producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>, GatewayError>> + Send + 'static,
    {
        Self {
            key: key.into(),
            ttl,
            producer: Arc::new(move || Box::pin(producer())),
        }
    }
}

/// Runs `entries` through `cache.set` at startup and every `interval`
/// thereafter. A single entry's producer failing is logged and skipped —
/// warm-up never blocks readiness and never aborts the remaining entries.
pub struct Warmup {
    cache: Arc<TieredCache>,
    entries: Vec<WarmupEntry>,
    interval: Duration,
}

impl Warmup {
    pub fn new(cache: Arc<TieredCache>, entries: Vec<WarmupEntry>, interval: Duration) -> Self {
        Self { cache, entries, interval }
    }

    /// Runs one warm-up pass over every entry, returning the count that
    /// failed. Exposed directly so callers (and tests) don't need to wait
    /// out a full tick to observe a pass.
    pub async fn run_once(&self) -> usize {
        let mut failures = 0;
        for entry in &self.entries {
            match (entry.producer)().await {
                Ok(value) => {
                    if let Err(_err) = self.cache.set(&entry.key, value, entry.ttl).await {
                        failures += 1;
                        #[cfg(feature = "tracing")]
                        warn!(key = %entry.key, error = %_err, "warm-up: cache write failed");
                    }
                }
                Err(_err) => {
                    failures += 1;
                    #[cfg(feature = "tracing")]
                    warn!(key = %entry.key, error = %_err, "warm-up: producer failed");
                }
            }
        }
        #[cfg(feature = "tracing")]
        debug!(total = self.entries.len(), failures, "warm-up pass complete");
        failures
    }

    /// Runs warm-up immediately, then on every `interval` tick, until
    /// `ctx` is cancelled.
    pub async fn run(&self, ctx: &Context) {
        self.run_once().await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // first tick fires immediately; already ran above

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return,
                _ = ticker.tick() => { self.run_once().await; }
            }
        }
    }
}
