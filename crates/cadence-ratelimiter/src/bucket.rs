//! The token-bucket state backing [`crate::TokenBucket`].

use std::time::{Duration, Instant};

/// `{ tokens, capacity, refill_rate, last_refill }`, matching the design's
/// token-bucket data model exactly.
///
/// Invariant: `0 <= tokens <= capacity`; `tokens` only ever grows via
/// elapsed-time refill, and only ever shrinks by one per granted permit.
#[derive(Debug)]
pub(crate) struct BucketState {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl BucketState {
    pub(crate) fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_rate,
            tokens: f64::from(capacity),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Refills by elapsed time, then consumes one token if available.
    pub(crate) fn try_acquire(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub(crate) fn available_tokens(&mut self) -> f64 {
        self.refill(Instant::now());
        self.tokens
    }
}
