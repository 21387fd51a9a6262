//! Composes the rate limiter, circuit breaker, and retry layers into the
//! single `call` entry point every upstream invocation goes through.

use crate::descriptor::UpstreamDescriptor;
use cadence_breaker::CircuitBreaker;
use cadence_core::{Context, GatewayError};
use cadence_ratelimiter::TokenBucket;
use cadence_retry::{retry, RetryConfig};
use std::future::Future;

/// One upstream's rate limiter + breaker + retry, bound together exactly in
/// pipeline order: a rejection at A or B never touches C's retry budget.
pub struct Pipeline {
    upstream: String,
    limiter: TokenBucket,
    breaker: CircuitBreaker,
    retry_config: RetryConfig,
}

impl Pipeline {
    pub fn new(descriptor: &UpstreamDescriptor) -> Self {
        Self {
            upstream: descriptor.name.clone(),
            limiter: TokenBucket::new(
                descriptor.name.clone(),
                descriptor.rate_limit.capacity,
                descriptor.rate_limit.refill_per_sec,
            ),
            breaker: CircuitBreaker::new(descriptor.name.clone(), descriptor.breaker),
            retry_config: descriptor.retry,
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn breaker_state(&self) -> cadence_breaker::CircuitState {
        self.breaker.state()
    }

    /// Runs `call` through Layer A (rate limit), Layer B (breaker), Layer C
    /// (retry), in that order. A rejection at A or B returns immediately
    /// without invoking `call` at all.
    pub async fn call<F, Fut, T>(&self, ctx: &Context, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        self.limiter.try_acquire()?;
        self.breaker.try_acquire()?;

        let outcome = retry(ctx, &self.retry_config, &mut call).await;
        match outcome {
            Ok(value) => {
                self.breaker.record_success();
                Ok(value)
            }
            Err(err) => {
                if !matches!(err, GatewayError::ContextCancelled) {
                    self.breaker.record_failure();
                }
                Err(err)
            }
        }
    }
}
