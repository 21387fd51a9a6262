//! The bounded, TTL-aware LRU store backing [`crate::L1Cache`].

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// An entry as stored in L1: the raw bytes plus the instant after which it
/// is treated as absent, even though it is still physically present until
/// evicted or swept.
#[derive(Clone, Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Result of a single `get`: whether it was a hit, and whether the entry
/// was found but expired (so the caller can account for the eviction).
pub(crate) enum GetOutcome {
    Hit(Vec<u8>),
    Miss,
    ExpiredAndRemoved,
}

/// `lru::LruCache` wrapper that stamps entries with an absolute expiry and
/// knows how to walk its own least-recently-used tail for sweeping.
pub(crate) struct Store {
    inner: lru::LruCache<String, Entry>,
    ttl: Duration,
}

impl Store {
    pub(crate) fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: lru::LruCache::new(cap),
            ttl,
        }
    }

    /// Marks `key` most-recently-used and returns its value if present and
    /// unexpired. An expired entry observed on read is removed immediately,
    /// rather than left to linger until the next sweep.
    pub(crate) fn get(&mut self, key: &str) -> GetOutcome {
        let now = Instant::now();
        let expired = match self.inner.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return GetOutcome::Miss,
        };

        if expired {
            self.inner.pop(key);
            GetOutcome::ExpiredAndRemoved
        } else {
            // `get` already promoted the entry to most-recently-used.
            GetOutcome::Hit(self.inner.get(key).unwrap().value.clone())
        }
    }

    /// Inserts or overwrites `key`, stamping a fresh expiry and marking it
    /// most-recent. Returns the evicted key, if the cache was at capacity
    /// and a different key had to make room.
    pub(crate) fn set(&mut self, key: String, value: Vec<u8>) -> Option<String> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.inner.push(key, entry).map(|(evicted_key, _)| evicted_key)
    }

    pub(crate) fn delete(&mut self, key: &str) -> bool {
        self.inner.pop(key).is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.inner.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    /// Walks the least-recently-used tail, popping expired entries until an
    /// unexpired one is observed (or the cache is empty). `O(expired)`.
    pub(crate) fn sweep_expired(&mut self) -> usize {
        let now = Instant::now();
        let mut swept = 0;

        while let Some((_, entry)) = self.inner.peek_lru() {
            if entry.is_expired(now) {
                self.inner.pop_lru();
                swept += 1;
            } else {
                break;
            }
        }

        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_on_fresh_entry_hits() {
        let mut store = Store::new(10, Duration::from_secs(10));
        store.set("a".into(), b"1".to_vec());
        match store.get("a") {
            GetOutcome::Hit(v) => assert_eq!(v, b"1"),
            _ => panic!("expected hit"),
        }
    }

    #[test]
    fn expired_entry_removed_on_read() {
        let mut store = Store::new(10, Duration::from_millis(10));
        store.set("a".into(), b"1".to_vec());
        std::thread::sleep(Duration::from_millis(20));
        assert!(matches!(store.get("a"), GetOutcome::ExpiredAndRemoved));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn sweep_stops_at_first_unexpired_tail_entry() {
        let mut store = Store::new(10, Duration::from_millis(30));
        store.set("old1".into(), b"1".to_vec());
        store.set("old2".into(), b"2".to_vec());
        std::thread::sleep(Duration::from_millis(40));
        store.set("fresh".into(), b"3".to_vec());

        let swept = store.sweep_expired();
        assert_eq!(swept, 2);
        assert_eq!(store.len(), 1);
    }
}
