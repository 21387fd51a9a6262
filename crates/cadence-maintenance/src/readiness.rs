//! Composite readiness: one probe that rolls up the shared KV store and
//! every upstream's health check into a single `HEALTHY`/`DEGRADED`/
//! `UNHEALTHY` verdict, with per-check latency and error detail attached
//! for observability.

use cadence_core::Context;
use cadence_fallback::SourceHealth;
use cadence_kv::KvAdapter;
use cadence_upstream::UpstreamAdapter;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Overall verdict returned by [`ReadinessAggregator::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessStatus {
    /// Every hard dependency (KV store) is up and every source is up.
    Healthy,
    /// The KV store or at least one source is down, but the gateway can
    /// still serve some traffic (the KV store is up, or at least one
    /// source is up).
    Degraded,
    /// No source is up and the KV store is down: the gateway cannot serve
    /// any request.
    Unhealthy,
}

/// The result of one dependency check: did it pass, how long did it take,
/// and (on failure) why.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub healthy: bool,
    pub latency: Duration,
    pub error: Option<String>,
}

/// The full readiness report: the rolled-up status plus every individual
/// check that fed it.
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub status: ReadinessStatus,
    pub checks: Vec<CheckResult>,
}

/// Composes a KV ping and every configured upstream's health probe into a
/// [`ReadinessReport`]. Also records each upstream result into a shared
/// [`SourceHealth`] so the fallback coordinator's next request sees
/// up-to-date liveness without re-probing.
pub struct ReadinessAggregator {
    kv: KvAdapter,
    upstreams: Vec<Arc<dyn UpstreamAdapter>>,
    source_health: Arc<SourceHealth>,
}

impl ReadinessAggregator {
    pub fn new(
        kv: KvAdapter,
        upstreams: Vec<Arc<dyn UpstreamAdapter>>,
        source_health: Arc<SourceHealth>,
    ) -> Self {
        Self {
            kv,
            upstreams,
            source_health,
        }
    }

    pub async fn check(&self, ctx: &Context) -> ReadinessReport {
        let mut checks = Vec::with_capacity(self.upstreams.len() + 1);

        let kv_check = self.check_kv().await;
        let kv_healthy = kv_check.healthy;
        checks.push(kv_check);

        let mut any_source_healthy = false;
        let mut all_sources_healthy = !self.upstreams.is_empty();

        for upstream in &self.upstreams {
            let check = Self::check_upstream(ctx, upstream.as_ref()).await;
            self.source_health.record(upstream.name(), check.healthy);
            any_source_healthy |= check.healthy;
            all_sources_healthy &= check.healthy;
            checks.push(check);
        }

        let status = if kv_healthy && all_sources_healthy {
            ReadinessStatus::Healthy
        } else if kv_healthy || any_source_healthy {
            ReadinessStatus::Degraded
        } else {
            ReadinessStatus::Unhealthy
        };

        ReadinessReport { status, checks }
    }

    async fn check_kv(&self) -> CheckResult {
        let start = Instant::now();
        let result = self.kv.ping().await;
        CheckResult {
            name: "kv".to_string(),
            healthy: result.is_ok(),
            latency: start.elapsed(),
            error: result.err().map(|err| err.to_string()),
        }
    }

    async fn check_upstream(ctx: &Context, upstream: &dyn UpstreamAdapter) -> CheckResult {
        let start = Instant::now();
        let result = upstream.health_probe(ctx).await;
        CheckResult {
            name: upstream.name().to_string(),
            healthy: result.is_ok(),
            latency: start.elapsed(),
            error: result.err().map(|err| err.to_string()),
        }
    }
}
