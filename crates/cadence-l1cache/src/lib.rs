//! The L1 tier: a bounded, in-process LRU cache with per-entry TTL.
//!
//! This is the cheapest, hottest tier in the gateway's three-tier cache —
//! zero round-trips for keys it holds. It never talks to the network; the
//! tiered cache in `cadence-cache` is the thing that composes this with the
//! remote KV tier and the stale reserve.
//!
//! # Example
//!
//! ```
//! use cadence_l1cache::L1Cache;
//! use std::time::Duration;
//!
//! let cache = L1Cache::builder()
//!     .max_size(1000)
//!     .ttl(Duration::from_secs(30))
//!     .build();
//!
//! cache.set("song:42", b"...".to_vec());
//! assert!(cache.get("song:42").is_some());
//! ```

mod events;
mod stats;
mod store;

pub use events::CacheEvent;
pub use stats::CacheStats;

use cadence_core::EventListeners;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use stats::Counters;
use store::{GetOutcome, Store};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// A bounded, TTL-aware, single-process LRU cache.
///
/// Invariant: `size() <= max_size` at all times. An entry whose `expires_at`
/// is in the past is treated as absent on read and removed if observed.
/// All operations are safe under concurrent callers; exactly one internal
/// mutex is held for the duration of each call.
pub struct L1Cache {
    name: String,
    store: Mutex<Store>,
    counters: Counters,
    event_listeners: EventListeners<CacheEvent>,
}

impl L1Cache {
    /// Starts building an `L1Cache`.
    pub fn builder() -> L1CacheBuilder {
        L1CacheBuilder::new()
    }

    /// Looks up `key`, marking it most-recent on a hit.
    ///
    /// Returns `None` on a miss, including a miss caused by the entry
    /// having expired (it is removed from the store in that case).
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let outcome = self.store.lock().unwrap().get(key);
        match outcome {
            GetOutcome::Hit(value) => {
                self.counters.record_hit();
                self.emit(CacheEvent::Hit {
                    name: self.name.clone(),
                    timestamp: Instant::now(),
                });
                #[cfg(feature = "metrics")]
                counter!("l1_cache_hits_total", "cache" => self.name.clone()).increment(1);
                Some(value)
            }
            GetOutcome::Miss | GetOutcome::ExpiredAndRemoved => {
                self.counters.record_miss();
                self.emit(CacheEvent::Miss {
                    name: self.name.clone(),
                    timestamp: Instant::now(),
                });
                #[cfg(feature = "metrics")]
                counter!("l1_cache_misses_total", "cache" => self.name.clone()).increment(1);
                None
            }
        }
    }

    /// Inserts or overwrites `key`, stamping a fresh TTL and marking it
    /// most-recent. Evicts the least-recently-used entry if the cache was
    /// at capacity.
    pub fn set(&self, key: impl Into<String>, value: Vec<u8>) {
        let evicted = self.store.lock().unwrap().set(key.into(), value);
        if evicted.is_some() {
            self.emit(CacheEvent::Eviction {
                name: self.name.clone(),
                timestamp: Instant::now(),
            });
            #[cfg(feature = "metrics")]
            counter!("l1_cache_evictions_total", "cache" => self.name.clone()).increment(1);
        }
        #[cfg(feature = "metrics")]
        gauge!("l1_cache_size", "cache" => self.name.clone()).set(self.size() as f64);
    }

    /// Removes `key` if present. Idempotent.
    pub fn delete(&self, key: &str) -> bool {
        self.store.lock().unwrap().delete(key)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.store.lock().unwrap().clear();
    }

    /// Current number of entries (expired-but-unswept entries still count
    /// until observed on read or swept).
    pub fn size(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    /// Walks the recency tail removing expired entries until an unexpired
    /// one is observed (or the cache empties). Runs in `O(expired)`.
    pub fn sweep_expired(&self) -> usize {
        let swept = self.store.lock().unwrap().sweep_expired();
        if swept > 0 {
            self.emit(CacheEvent::Swept {
                name: self.name.clone(),
                timestamp: Instant::now(),
                count: swept,
            });
        }
        swept
    }

    /// A best-effort snapshot of size and cumulative hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.size())
    }

    fn emit(&self, event: CacheEvent) {
        self.event_listeners.emit(&event);
    }
}

/// Builder for [`L1Cache`].
pub struct L1CacheBuilder {
    max_size: usize,
    ttl: Duration,
    name: String,
    event_listeners: EventListeners<CacheEvent>,
}

impl L1CacheBuilder {
    fn new() -> Self {
        Self {
            max_size: 1000,
            ttl: Duration::from_secs(60),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Maximum number of resident entries. Default: 1000.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Per-entry TTL, stamped at `set` time. Default: 60s.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Name used in events/metrics labels. Default: `"<unnamed>"`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers an event listener (see [`CacheEvent`]).
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: cadence_core::EventListener<CacheEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    pub fn build(self) -> L1Cache {
        L1Cache {
            name: self.name,
            store: Mutex::new(Store::new(self.max_size, self.ttl)),
            counters: Counters::default(),
            event_listeners: self.event_listeners,
        }
    }
}
