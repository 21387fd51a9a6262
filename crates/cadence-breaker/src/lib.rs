//! Per-upstream circuit breaking, Layer B of the resilience pipeline.
//!
//! Sits between the rate limiter and the retrying HTTP client: a call that
//! makes it past the token bucket still has to be admitted here before it
//! reaches the network. Three states — `CLOSED`, `OPEN`, `HALF_OPEN` — and a
//! `run` method that wraps a fallible async call, recording its outcome
//! against the breaker's counters.
//!
//! # Example
//!
//! ```
//! use cadence_breaker::{BreakerConfig, CircuitBreaker};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let breaker = CircuitBreaker::new(
//!     "spotify",
//!     BreakerConfig {
//!         max_failures: 5,
//!         cooldown: Duration::from_secs(30),
//!         probe_budget: 3,
//!     },
//! );
//!
//! let result: Result<&str, &str> = breaker.run(|| async { Ok("ok") }).await;
//! assert_eq!(result.unwrap(), "ok");
//! # }
//! ```

mod circuit;

use cadence_core::GatewayError;
use circuit::{Admission, Circuit};
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;

pub use circuit::{CircuitMetrics, CircuitState};

#[cfg(feature = "tracing")]
use tracing::info;

#[cfg(feature = "metrics")]
use metrics::counter;

/// `{max_failures, cooldown, probe_budget}` — the only tunables the breaker
/// state machine reads; the trip predicate itself (`consecutive_failures >=
/// max_failures`) is fixed.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures in CLOSED before tripping to OPEN.
    pub max_failures: u64,
    /// How long the breaker stays OPEN before allowing a HALF_OPEN probe.
    pub cooldown: Duration,
    /// Concurrent probes admitted in HALF_OPEN, and the number of
    /// consecutive successes required to close again.
    pub probe_budget: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            cooldown: Duration::from_secs(30),
            probe_budget: 3,
        }
    }
}

/// A single upstream's circuit breaker.
pub struct CircuitBreaker {
    upstream: String,
    circuit: Mutex<Circuit>,
}

impl CircuitBreaker {
    pub fn new(upstream: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            upstream: upstream.into(),
            circuit: Mutex::new(Circuit::new(
                config.max_failures,
                config.cooldown,
                config.probe_budget,
            )),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.circuit.lock().state()
    }

    /// A snapshot of this breaker's counters, for a readiness/metrics
    /// endpoint to report alongside `state()`.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().metrics()
    }

    /// Admits or denies a call, without running anything. Exposed so a
    /// caller that needs to combine the breaker with its own retry/backoff
    /// logic doesn't have to go through [`Self::run`].
    pub fn try_acquire(&self) -> Result<(), GatewayError> {
        match self.circuit.lock().try_acquire() {
            Admission::Permit => Ok(()),
            Admission::Denied { retry_after } => {
                self.record_rejection();
                Err(GatewayError::CircuitOpen {
                    upstream: self.upstream.clone(),
                    retry_after,
                })
            }
        }
    }

    /// Admits the call if the breaker allows it, runs `f`, and records the
    /// outcome. Any `Err` counts as a breaker failure; `Ok` counts as a
    /// success.
    pub async fn run<F, Fut, T, E>(&self, f: F) -> Result<T, BreakerOutcome<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(_denied) = self.try_acquire_internal() {
            return Err(BreakerOutcome::Open);
        }

        match f().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(BreakerOutcome::Inner(err))
            }
        }
    }

    fn try_acquire_internal(&self) -> Result<(), ()> {
        match self.circuit.lock().try_acquire() {
            Admission::Permit => Ok(()),
            Admission::Denied { .. } => {
                self.record_rejection();
                Err(())
            }
        }
    }

    /// Records a successful call outside of [`Self::run`] — for callers
    /// that admitted via [`Self::try_acquire`] and drove the call
    /// themselves.
    pub fn record_success(&self) {
        self.circuit.lock().record_success();
        #[cfg(feature = "tracing")]
        if self.state() == CircuitState::Closed {
            info!(upstream = %self.upstream, "circuit breaker: call succeeded");
        }
        #[cfg(feature = "metrics")]
        counter!("breaker_calls_total", "upstream" => self.upstream.clone(), "outcome" => "success")
            .increment(1);
    }

    /// Records a failed call outside of [`Self::run`].
    pub fn record_failure(&self) {
        let mut circuit = self.circuit.lock();
        let was_closed = circuit.state() == CircuitState::Closed;
        circuit.record_failure();
        let tripped = was_closed && circuit.state() == CircuitState::Open;
        drop(circuit);

        #[cfg(feature = "tracing")]
        if tripped {
            info!(upstream = %self.upstream, "circuit breaker: tripped open");
        }
        #[cfg(feature = "metrics")]
        counter!("breaker_calls_total", "upstream" => self.upstream.clone(), "outcome" => "failure")
            .increment(1);
    }

    fn record_rejection(&self) {
        #[cfg(feature = "metrics")]
        counter!("breaker_rejected_total", "upstream" => self.upstream.clone()).increment(1);
        #[cfg(not(feature = "metrics"))]
        let _ = &self.upstream;
    }
}

/// The result of [`CircuitBreaker::run`]: either the breaker denied the
/// call outright, or it ran and the inner future failed with `E`.
#[derive(Debug)]
pub enum BreakerOutcome<E> {
    Open,
    Inner(E),
}

impl<E> BreakerOutcome<E> {
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerOutcome::Inner(err) => Some(err),
            BreakerOutcome::Open => None,
        }
    }
}
