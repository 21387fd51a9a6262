//! Per-upstream token-bucket rate limiting, Layer A of the resilience
//! pipeline.
//!
//! Each upstream gets its own bucket: capacity `C`, refill rate `r`
//! tokens/sec. A call that finds no token available fails immediately with
//! [`GatewayError::RateLimited`] and never reaches the circuit breaker or
//! the HTTP client underneath it — this layer only ever sheds load, it
//! never queues or sleeps.
//!
//! # Example
//!
//! ```
//! use cadence_ratelimiter::TokenBucket;
//!
//! let limiter = TokenBucket::new("spotify", 5, 1.0);
//! assert!(limiter.try_acquire().is_ok());
//! ```

mod bucket;

use bucket::BucketState;
use cadence_core::GatewayError;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::debug;

#[cfg(feature = "metrics")]
use metrics::counter;

/// A single upstream's token bucket.
///
/// `capacity` tokens refill at `refill_rate` tokens/sec, capped at
/// `capacity`. `try_acquire` refills by elapsed time and then attempts to
/// consume exactly one token, never blocking.
pub struct TokenBucket {
    upstream: String,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a bucket for `upstream`, starting full.
    pub fn new(upstream: impl Into<String>, capacity: u32, refill_rate: f64) -> Self {
        Self {
            upstream: upstream.into(),
            state: Mutex::new(BucketState::new(capacity, refill_rate)),
        }
    }

    /// Refills by elapsed time, then attempts to consume one token.
    ///
    /// Returns `Err(GatewayError::RateLimited)` immediately if none are
    /// available — no waiting, no retry, and Layer B is never entered.
    pub fn try_acquire(&self) -> Result<(), GatewayError> {
        let acquired = self.state.lock().try_acquire();
        if acquired {
            #[cfg(feature = "metrics")]
            counter!("ratelimiter_acquired_total", "upstream" => self.upstream.clone()).increment(1);
            Ok(())
        } else {
            #[cfg(feature = "tracing")]
            debug!(upstream = %self.upstream, "rate limiter: no tokens available");
            #[cfg(feature = "metrics")]
            counter!("ratelimiter_rejected_total", "upstream" => self.upstream.clone()).increment(1);
            Err(GatewayError::RateLimited {
                upstream: self.upstream.clone(),
            })
        }
    }

    /// Tokens currently available, after an as-of-now refill. For
    /// diagnostics and tests; not part of the acquire path.
    pub fn available_tokens(&self) -> f64 {
        self.state.lock().available_tokens()
    }

    /// The upstream name this bucket guards.
    pub fn upstream(&self) -> &str {
        &self.upstream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausting_the_bucket_rate_limits_without_blocking() {
        let limiter = TokenBucket::new("spotify", 2, 0.0);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
        assert!(matches!(
            limiter.try_acquire(),
            Err(GatewayError::RateLimited { upstream }) if upstream == "spotify"
        ));
    }

    #[test]
    fn refill_eventually_permits_another_call() {
        let limiter = TokenBucket::new("spotify", 1, 20.0);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());
        std::thread::sleep(std::time::Duration::from_millis(60));
        assert!(limiter.try_acquire().is_ok());
    }

    #[test]
    fn independent_upstreams_have_independent_buckets() {
        let spotify = TokenBucket::new("spotify", 1, 0.0);
        let apple = TokenBucket::new("apple-music", 1, 0.0);
        assert!(spotify.try_acquire().is_ok());
        assert!(spotify.try_acquire().is_err());
        assert!(apple.try_acquire().is_ok());
    }
}
