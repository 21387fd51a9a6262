//! The state machine backing [`crate::CircuitBreaker`].

use std::time::{Duration, Instant};

/// `CLOSED` / `OPEN` / `HALF_OPEN`, matching the design's three breaker
/// states exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Whether the breaker permits a call right now. `Denied` carries how much
/// longer the breaker expects to stay open, when known.
pub(crate) enum Admission {
    Permit,
    Denied { retry_after: Option<Duration> },
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub(crate) requests: u64,
    pub(crate) successes: u64,
    pub(crate) failures: u64,
    pub(crate) consecutive_successes: u64,
    pub(crate) consecutive_failures: u64,
}

/// Point-in-time snapshot of a breaker's counters, scoped to the current
/// state (the counters reset on every transition, so this reflects calls
/// since the breaker last changed state, not a fixed-size sliding window).
///
/// `slow_call_count`/`slow_call_rate` are always zero: this breaker trips on
/// consecutive failures only, it has no latency threshold to classify a call
/// as slow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    pub total_calls: u64,
    pub failure_count: u64,
    pub success_count: u64,
    pub slow_call_count: u64,
    pub failure_rate: f64,
    pub slow_call_rate: f64,
}

pub(crate) struct Circuit {
    state: CircuitState,
    counters: Counters,
    open_until: Instant,
    half_open_probes_in_flight: u64,
    max_failures: u64,
    cooldown: Duration,
    probe_budget: u64,
}

impl Circuit {
    pub(crate) fn new(max_failures: u64, cooldown: Duration, probe_budget: u64) -> Self {
        Self {
            state: CircuitState::Closed,
            counters: Counters::default(),
            open_until: Instant::now(),
            half_open_probes_in_flight: 0,
            max_failures,
            cooldown,
            probe_budget,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn counters(&self) -> Counters {
        self.counters
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        let total_calls = self.counters.requests;
        let failure_rate = if total_calls == 0 {
            0.0
        } else {
            self.counters.failures as f64 / total_calls as f64
        };
        CircuitMetrics {
            state: self.state,
            total_calls,
            failure_count: self.counters.failures,
            success_count: self.counters.successes,
            slow_call_count: 0,
            failure_rate,
            slow_call_rate: 0.0,
        }
    }

    /// Applies the admission rule for the current state, transitioning
    /// OPEN → HALF_OPEN when the cooldown has elapsed.
    pub(crate) fn try_acquire(&mut self) -> Admission {
        match self.state {
            CircuitState::Closed => Admission::Permit,
            CircuitState::Open => {
                let now = Instant::now();
                if now >= self.open_until {
                    self.transition_to(CircuitState::HalfOpen);
                    self.half_open_probes_in_flight = 1;
                    Admission::Permit
                } else {
                    Admission::Denied {
                        retry_after: Some(self.open_until.saturating_duration_since(now)),
                    }
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_probes_in_flight < self.probe_budget {
                    self.half_open_probes_in_flight += 1;
                    Admission::Permit
                } else {
                    Admission::Denied { retry_after: None }
                }
            }
        }
    }

    pub(crate) fn record_success(&mut self) {
        self.counters.requests += 1;
        self.counters.successes += 1;
        self.counters.consecutive_successes += 1;
        self.counters.consecutive_failures = 0;

        if self.state == CircuitState::HalfOpen {
            self.half_open_probes_in_flight = self.half_open_probes_in_flight.saturating_sub(1);
            if self.counters.consecutive_successes >= self.probe_budget {
                self.transition_to(CircuitState::Closed);
            }
        }
    }

    pub(crate) fn record_failure(&mut self) {
        self.counters.requests += 1;
        self.counters.failures += 1;
        self.counters.consecutive_failures += 1;
        self.counters.consecutive_successes = 0;

        match self.state {
            CircuitState::HalfOpen => {
                self.half_open_probes_in_flight =
                    self.half_open_probes_in_flight.saturating_sub(1);
                self.trip();
            }
            CircuitState::Closed => {
                if self.counters.consecutive_failures >= self.max_failures {
                    self.trip();
                }
            }
            CircuitState::Open => {}
        }
    }

    fn trip(&mut self) {
        self.open_until = Instant::now() + self.cooldown;
        self.transition_to(CircuitState::Open);
    }

    fn transition_to(&mut self, state: CircuitState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.counters = Counters::default();
        self.half_open_probes_in_flight = 0;
    }
}
