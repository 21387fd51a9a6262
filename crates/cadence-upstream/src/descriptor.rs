//! Immutable per-upstream configuration.

use cadence_breaker::BreakerConfig;
use cadence_retry::RetryConfig;
use std::time::Duration;

/// `{ name, base_url, timeout, max_retries, rate_limit, breaker_config,
/// credentials }`, as named in the design's upstream descriptor.
#[derive(Debug, Clone)]
pub struct UpstreamDescriptor {
    pub name: String,
    pub base_url: String,
    pub timeout: Duration,
    pub rate_limit: RateLimitConfig,
    pub breaker: BreakerConfig,
    pub retry: RetryConfig,
    /// Bearer token or API key, sent as `Authorization` when present.
    pub credentials: Option<String>,
}

/// Token-bucket parameters for one upstream.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_per_sec: 5.0,
        }
    }
}
