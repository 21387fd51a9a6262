//! The tiered cache: L1 memory → L2 remote KV → L3 stale reserve, with
//! single-flight loading on a cold key.
//!
//! This is the component everything else in the gateway calls through: the
//! orchestrator never talks to `cadence-l1cache` or `cadence-kv` directly.
//! `L1` cuts round-trip time to zero for hot keys; `L2` gives fleet-wide
//! sharing; `L3` (the stale reserve) decouples availability from upstream
//! liveness when a loader fails; single-flight prevents herd amplification
//! on a cold-key arrival.
//!
//! # Example
//!
//! ```no_run
//! use cadence_cache::TieredCache;
//! use cadence_core::Context;
//! use cadence_kv::KvAdapter;
//! use cadence_l1cache::L1Cache;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let l1 = L1Cache::builder().build();
//! let l2 = KvAdapter::connect("redis://127.0.0.1:6379", "song-cache").await?;
//! let cache = TieredCache::builder(l1, l2).build();
//!
//! let ctx = Context::background();
//! let result = cache
//!     .get_or_load(&ctx, "song:42", || async { Ok(b"bytes".to_vec()) }, Duration::from_secs(300))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use cadence_coalesce::SingleFlight;
use cadence_core::{Context, GatewayError};
use cadence_kv::KvAdapter;
use cadence_l1cache::L1Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::warn;

/// Long-horizon stale-copy TTL, design default: a day.
pub const DEFAULT_STALE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// The namespace every stale copy lives under, regardless of the L2
/// adapter's own prefix.
const STALE_PREFIX: &str = "stale";

/// Outcome of [`TieredCache::get_or_load`]: the bytes, and whether they came
/// from the stale reserve after the loader failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub value: Vec<u8>,
    pub served_stale: bool,
}

/// Composes an [`L1Cache`], a [`KvAdapter`] (L2), a derived stale-reserve
/// adapter (L3), and a [`SingleFlight`] registry keyed by cache key.
pub struct TieredCache {
    l1: Arc<L1Cache>,
    l2: KvAdapter,
    stale: KvAdapter,
    stale_ttl: Duration,
    single_flight: Arc<SingleFlight<LoadResult>>,
}

impl TieredCache {
    /// Starts building a `TieredCache` over `l1` and `l2`.
    pub fn builder(l1: L1Cache, l2: KvAdapter) -> TieredCacheBuilder {
        TieredCacheBuilder::new(l1, l2)
    }

    /// The shared L1 handle, for callers (the maintenance scheduler) that
    /// need to run operations like `sweep_expired` against the same
    /// instance this cache reads and writes through.
    pub fn l1(&self) -> Arc<L1Cache> {
        Arc::clone(&self.l1)
    }

    /// Consults L1, then L2 on a miss. Backfills L1 on an L2 hit. Never
    /// consults the stale reserve — that tier is reserved for loader
    /// failure, not for an ordinary read.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, GatewayError> {
        if let Some(value) = self.l1.get(key) {
            return Ok(value);
        }

        match self.l2.get(key).await {
            Ok(value) => {
                self.l1.set(key.to_string(), value.clone());
                Ok(value)
            }
            Err(GatewayError::CacheMiss) => Err(GatewayError::CacheMiss),
            Err(err) => Err(err),
        }
    }

    /// `get`, but on a miss, coalesces concurrent callers through a single
    /// invocation of `loader` per key:
    ///
    /// 1. Re-checks L1/L2 inside the single-flight (another caller may have
    ///    just filled it).
    /// 2. Invokes `loader`; on success, fills all three tiers and returns.
    /// 3. On loader failure, falls back to the stale reserve; if present,
    ///    returns it with `served_stale: true`; otherwise propagates the
    ///    loader's error.
    pub async fn get_or_load<F, Fut>(
        &self,
        ctx: &Context,
        key: &str,
        loader: F,
        ttl: Duration,
    ) -> Result<LoadResult, GatewayError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<u8>, GatewayError>> + Send + 'static,
    {
        match self.get(key).await {
            Ok(value) => return Ok(LoadResult { value, served_stale: false }),
            Err(GatewayError::CacheMiss) => {}
            Err(err) => return Err(err),
        }

        let l1 = Arc::clone(&self.l1);
        let l2 = self.l2.clone();
        let stale = self.stale.clone();
        let stale_ttl = self.stale_ttl;
        let key_owned = key.to_string();

        self.single_flight
            .get_or_load(ctx, key, move || async move {
                // Another arriver may have filled the cache between our
                // outer miss and becoming the single-flight leader.
                if let Some(value) = l1.get(&key_owned) {
                    return Ok(LoadResult { value, served_stale: false });
                }
                match l2.get(&key_owned).await {
                    Ok(value) => {
                        l1.set(key_owned.clone(), value.clone());
                        return Ok(LoadResult { value, served_stale: false });
                    }
                    Err(GatewayError::CacheMiss) => {}
                    Err(err) => return Err(err),
                }

                match loader().await {
                    Ok(value) => {
                        write_through(&l1, &l2, &stale, &key_owned, &value, ttl, stale_ttl).await?;
                        Ok(LoadResult { value, served_stale: false })
                    }
                    Err(loader_err) => match stale.get(&key_owned).await {
                        Ok(value) => Ok(LoadResult { value, served_stale: true }),
                        Err(_) => Err(loader_err),
                    },
                }
            })
            .await
    }

    /// Writes `value` to L1 (always), L2 (`ttl`; failure is returned), and
    /// the stale reserve (the configured stale TTL; failure is logged and
    /// swallowed).
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), GatewayError> {
        write_through(&self.l1, &self.l2, &self.stale, key, &value, ttl, self.stale_ttl).await
    }

    /// Removes `key` from all three tiers. A stale-reserve failure is
    /// logged and swallowed, matching `set`'s write-through policy.
    pub async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.l1.delete(key);
        self.l2.delete(key).await?;
        if let Err(_err) = self.stale.delete(key).await {
            #[cfg(feature = "tracing")]
            warn!(key, error = %_err, "tiered cache: stale-reserve delete failed, ignoring");
        }
        Ok(())
    }
}

/// Fills L1, then L2, then the stale reserve, applying the write-through
/// failure policy shared by `set` and a successful `get_or_load` fill.
async fn write_through(
    l1: &L1Cache,
    l2: &KvAdapter,
    stale: &KvAdapter,
    key: &str,
    value: &[u8],
    ttl: Duration,
    stale_ttl: Duration,
) -> Result<(), GatewayError> {
    l1.set(key.to_string(), value.to_vec());
    l2.set(key, value, ttl).await?;
    if let Err(_err) = stale.set(key, value, stale_ttl).await {
        #[cfg(feature = "tracing")]
        warn!(key, error = %_err, "tiered cache: stale-reserve write failed, ignoring");
    }
    Ok(())
}

/// Builder for [`TieredCache`].
pub struct TieredCacheBuilder {
    l1: L1Cache,
    l2: KvAdapter,
    stale: Option<KvAdapter>,
    stale_ttl: Duration,
    single_flight_name: Option<String>,
}

impl TieredCacheBuilder {
    fn new(l1: L1Cache, l2: KvAdapter) -> Self {
        Self {
            l1,
            l2,
            stale: None,
            stale_ttl: DEFAULT_STALE_TTL,
            single_flight_name: None,
        }
    }

    /// Overrides the stale reserve's adapter. Default: the L2 adapter's
    /// connection, reused under the `"stale"` namespace.
    pub fn stale_adapter(mut self, stale: KvAdapter) -> Self {
        self.stale = Some(stale);
        self
    }

    /// Stale-copy TTL (`T₃`). Default: [`DEFAULT_STALE_TTL`].
    pub fn stale_ttl(mut self, ttl: Duration) -> Self {
        self.stale_ttl = ttl;
        self
    }

    /// Name used in the single-flight registry's metrics/tracing labels.
    pub fn single_flight_name(mut self, name: impl Into<String>) -> Self {
        self.single_flight_name = Some(name.into());
        self
    }

    pub fn build(self) -> TieredCache {
        let stale = self.stale.unwrap_or_else(|| self.l2.with_prefix(STALE_PREFIX));
        let single_flight = match self.single_flight_name {
            Some(name) => SingleFlight::named(name),
            None => SingleFlight::new(),
        };
        TieredCache {
            l1: Arc::new(self.l1),
            l2: self.l2,
            stale,
            stale_ttl: self.stale_ttl,
            single_flight: Arc::new(single_flight),
        }
    }
}
