//! Exponential-backoff retrying, Layer C of the resilience pipeline.
//!
//! Wraps a fallible async call in a retry loop governed by [`RetryConfig`].
//! Which outcomes are worth retrying is the caller's business — this crate
//! only runs the loop and computes delays; classification of an HTTP
//! response into `GatewayError::Timeout` / `UpstreamUnavailable` /
//! `UpstreamRejected` / `NotFound` happens one layer up, in the upstream
//! adapter, via [`cadence_core::GatewayError::is_retryable_by_http_layer`].
//!
//! # Example
//!
//! ```
//! use cadence_core::{Context, GatewayError};
//! use cadence_retry::{RetryConfig, retry};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let calls = Arc::new(AtomicU32::new(0));
//! let ctx = Context::background();
//! let config = RetryConfig::default();
//!
//! let result: Result<&str, GatewayError> = retry(&ctx, &config, || {
//!     let calls = Arc::clone(&calls);
//!     async move {
//!         if calls.fetch_add(1, Ordering::SeqCst) < 2 {
//!             Err(GatewayError::Timeout { upstream: "spotify".into() })
//!         } else {
//!             Ok("ok")
//!         }
//!     }
//! })
//! .await;
//!
//! assert_eq!(result.unwrap(), "ok");
//! # }
//! ```

use cadence_core::{Context, GatewayError};
use std::future::Future;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

#[cfg(feature = "metrics")]
use metrics::counter;

/// `{max_attempts, initial_wait, max_wait, multiplier}`.
///
/// Delay before attempt `i` (1-indexed, `i` > 1): `min(max_wait,
/// initial_wait * multiplier^(i-1))`. The first attempt never waits.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first. `1` disables retrying.
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub max_wait: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_millis(100),
            max_wait: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// The delay before attempt number `attempt` (1-indexed). `attempt <=
    /// 1` is always zero.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2) as i32;
        let scaled = self.initial_wait.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(scaled).min(self.max_wait)
    }
}

/// Runs `call`, retrying up to `config.max_attempts` times while the error
/// satisfies `GatewayError::is_retryable_by_http_layer`. Sleeps between
/// attempts are cancellable through `ctx`; a cancellation mid-wait returns
/// `GatewayError::ContextCancelled` immediately.
pub async fn retry<F, Fut, T>(
    ctx: &Context,
    config: &RetryConfig,
    mut call: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 1;
    loop {
        if attempt > 1 {
            let delay = config.backoff(attempt);
            #[cfg(feature = "tracing")]
            debug!(attempt, ?delay, "retry: waiting before next attempt");
            if !ctx.sleep(delay).await {
                return Err(GatewayError::ContextCancelled);
            }
        }

        if ctx.is_cancelled() {
            return Err(GatewayError::ContextCancelled);
        }

        match call().await {
            Ok(value) => {
                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "outcome" => "success").increment(1);
                return Ok(value);
            }
            Err(err) if attempt < config.max_attempts && err.is_retryable_by_http_layer() => {
                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "outcome" => "retry").increment(1);
                attempt += 1;
            }
            Err(err) => {
                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "outcome" => "exhausted").increment(1);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn backoff_follows_the_exponential_formula_capped_at_max_wait() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_wait: Duration::from_millis(100),
            max_wait: Duration::from_secs(1),
            multiplier: 2.0,
        };
        assert_eq!(config.backoff(1), Duration::ZERO);
        assert_eq!(config.backoff(2), Duration::from_millis(100));
        assert_eq!(config.backoff(3), Duration::from_millis(200));
        assert_eq!(config.backoff(4), Duration::from_millis(400));
        assert_eq!(config.backoff(5), Duration::from_millis(800));
        assert_eq!(config.backoff(6), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn succeeds_without_retrying_on_first_try() {
        let ctx = Context::background();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let result: Result<&str, GatewayError> = retry(&ctx, &RetryConfig::default(), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok("ok")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_a_timeout_until_it_succeeds() {
        let ctx = Context::background();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let config = RetryConfig {
            max_attempts: 5,
            initial_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(10),
            multiplier: 2.0,
        };

        let result: Result<&str, GatewayError> = retry(&ctx, &config, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(GatewayError::Timeout { upstream: "spotify".into() })
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn a_non_retryable_error_returns_immediately() {
        let ctx = Context::background();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let result: Result<&str, GatewayError> = retry(&ctx, &RetryConfig::default(), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::NotFound { upstream: "spotify".into() })
            }
        })
        .await;

        assert!(matches!(result, Err(GatewayError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_max_attempts_returns_the_last_error() {
        let ctx = Context::background();
        let config = RetryConfig {
            max_attempts: 3,
            initial_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(5),
            multiplier: 2.0,
        };

        let result: Result<&str, GatewayError> = retry(&ctx, &config, || async {
            Err(GatewayError::Timeout { upstream: "spotify".into() })
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Timeout { .. })));
    }

    #[tokio::test]
    async fn a_cancelled_context_stops_retrying_during_the_backoff_wait() {
        let ctx = Context::background();
        let config = RetryConfig {
            max_attempts: 5,
            initial_wait: Duration::from_secs(60),
            max_wait: Duration::from_secs(60),
            multiplier: 1.0,
        };
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let ctx_clone = ctx.child();
        let handle = tokio::spawn(async move {
            retry(&ctx_clone, &config, move || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::Timeout { upstream: "spotify".into() })
                }
            })
            .await
        });

        tokio::task::yield_now().await;
        ctx.cancel();
        let result = handle.await.unwrap();

        assert!(matches!(result, Err(GatewayError::ContextCancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
