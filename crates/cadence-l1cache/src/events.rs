//! Observability events emitted by [`crate::L1Cache`].

use cadence_core::ResilienceEvent;
use std::time::Instant;

/// A point-in-time event from the L1 cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// `get` found an unexpired entry.
    Hit { name: String, timestamp: Instant },
    /// `get` found nothing, or found an expired entry.
    Miss { name: String, timestamp: Instant },
    /// `set` pushed out the least-recently-used entry to make room.
    Eviction { name: String, timestamp: Instant },
    /// `sweep_expired` removed one or more expired tail entries.
    Swept {
        name: String,
        timestamp: Instant,
        count: usize,
    },
}

impl ResilienceEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Eviction { .. } => "eviction",
            CacheEvent::Swept { .. } => "swept",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. }
            | CacheEvent::Swept { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CacheEvent::Hit { name, .. }
            | CacheEvent::Miss { name, .. }
            | CacheEvent::Eviction { name, .. }
            | CacheEvent::Swept { name, .. } => name,
        }
    }
}
