//! Unified error kinds for the gateway's resilience fabric.
//!
//! Every layer in the stack (cache tiers, rate limiter, circuit breaker,
//! retrying HTTP client, fallback coordinator) ultimately produces one of
//! these kinds. Keeping them in one enum, rather than one error type per
//! crate plus a pile of `From` impls, is the same tradeoff `ResilienceError<E>`
//! makes upstream: composing layers shouldn't require writing conversion
//! boilerplate for every pair of them.

use std::fmt;
use std::time::Duration;

/// An error produced anywhere in the request path.
///
/// Variant names match the error kinds named in the design: `CacheMiss` is
/// internal and never reaches a client; the rest map to the propagation
/// policy described there (retry locally, demote to fallback, or surface to
/// the caller).
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Neither L1 nor L2 has the key. Internal signal only.
    CacheMiss,
    /// The shared KV store is unreachable or returned a store-level error.
    StoreFault(String),
    /// The local token bucket had no permits available.
    RateLimited {
        /// Upstream this limiter guards.
        upstream: String,
    },
    /// The circuit breaker denied the call without attempting it.
    CircuitOpen {
        /// Upstream whose breaker is open.
        upstream: String,
        /// How much longer the breaker will stay open, if known.
        retry_after: Option<Duration>,
    },
    /// The HTTP call did not complete within its timeout, or the transport
    /// failed outright. Retryable within the resilience pipeline.
    Timeout { upstream: String },
    /// The upstream responded with a 5xx status. Retryable within the
    /// resilience pipeline.
    UpstreamUnavailable { upstream: String, status: u16 },
    /// The upstream responded with a non-retryable 4xx status (not 404).
    UpstreamRejected { upstream: String, status: u16 },
    /// The upstream responded 404, or its success-sentinel field signaled
    /// "no such record" for a by-id lookup.
    NotFound { upstream: String },
    /// The upstream's response carries a distinct non-error sentinel
    /// meaning the content itself can't be served from here (region-locked,
    /// premium-gated, geo-blocked, ...). Normal, not a failure; demotes to
    /// fallback without counting against the breaker.
    ContentUnavailable { upstream: String, reason: String },
    /// Every source in the fallback chain was exhausted.
    NotFoundAnySource {
        /// One error per source attempted, in chain order.
        per_source: Vec<(String, Box<GatewayError>)>,
    },
    /// The ambient context was cancelled before or during the operation.
    ContextCancelled,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::CacheMiss => write!(f, "cache miss"),
            GatewayError::StoreFault(msg) => write!(f, "kv store fault: {msg}"),
            GatewayError::RateLimited { upstream } => {
                write!(f, "rate limited calling '{upstream}'")
            }
            GatewayError::CircuitOpen {
                upstream,
                retry_after,
            } => match retry_after {
                Some(d) => write!(f, "circuit '{upstream}' open, retry after {d:?}"),
                None => write!(f, "circuit '{upstream}' open"),
            },
            GatewayError::Timeout { upstream } => write!(f, "timeout calling '{upstream}'"),
            GatewayError::UpstreamUnavailable { upstream, status } => {
                write!(f, "'{upstream}' unavailable (status {status})")
            }
            GatewayError::UpstreamRejected { upstream, status } => {
                write!(f, "'{upstream}' rejected request (status {status})")
            }
            GatewayError::NotFound { upstream } => write!(f, "not found on '{upstream}'"),
            GatewayError::ContentUnavailable { upstream, reason } => {
                write!(f, "content unavailable on '{upstream}': {reason}")
            }
            GatewayError::NotFoundAnySource { per_source } => {
                write!(f, "not found in any of {} sources", per_source.len())
            }
            GatewayError::ContextCancelled => write!(f, "context cancelled"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    /// Whether the C4 retry layer should retry this outcome itself.
    pub fn is_retryable_by_http_layer(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout { .. } | GatewayError::UpstreamUnavailable { .. }
        )
    }

    /// Whether the fallback coordinator should try the next source rather
    /// than surface this error immediately.
    pub fn should_demote_to_fallback(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. }
                | GatewayError::CircuitOpen { .. }
                | GatewayError::Timeout { .. }
                | GatewayError::UpstreamUnavailable { .. }
                | GatewayError::UpstreamRejected { .. }
                | GatewayError::NotFound { .. }
                | GatewayError::ContentUnavailable { .. }
        )
    }

    /// The stable `code`/HTTP status pair the orchestrator's envelope uses.
    pub fn response_code(&self) -> (u16, i32) {
        match self {
            GatewayError::RateLimited { .. } => (429, 1429),
            GatewayError::NotFoundAnySource { .. } | GatewayError::NotFound { .. } => (404, 1404),
            GatewayError::ContextCancelled => (499, 1499),
            GatewayError::CircuitOpen { .. } => (503, 1503),
            GatewayError::UpstreamUnavailable { .. } | GatewayError::Timeout { .. } => {
                (502, 1502)
            }
            GatewayError::UpstreamRejected { .. } => (502, 1402),
            GatewayError::ContentUnavailable { .. } => (404, 1404),
            GatewayError::CacheMiss | GatewayError::StoreFault(_) => (500, 1500),
        }
    }
}
