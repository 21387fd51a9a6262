//! Per-source liveness tracking, backing `healthy_count()` for the
//! maintenance component's aggregate readiness check.

use cadence_core::Context;
use cadence_upstream::UpstreamAdapter;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Tracks the last-observed health of every source in the chain. Updated by
/// explicit `check` calls (driven by the maintenance scheduler, or inline by
/// the coordinator after an attempt) rather than polled on every request.
pub struct SourceHealth {
    state: RwLock<HashMap<String, bool>>,
}

impl SourceHealth {
    pub fn new(upstream_names: impl IntoIterator<Item = String>) -> Self {
        let state = upstream_names.into_iter().map(|name| (name, true)).collect();
        Self {
            state: RwLock::new(state),
        }
    }

    /// Probes `upstream` and records the result.
    pub async fn check(&self, ctx: &Context, upstream: &dyn UpstreamAdapter) -> bool {
        let healthy = upstream.health_probe(ctx).await.is_ok();
        self.state.write().insert(upstream.name().to_string(), healthy);
        healthy
    }

    pub fn record(&self, name: &str, healthy: bool) {
        self.state.write().insert(name.to_string(), healthy);
    }

    pub fn is_healthy(&self, name: &str) -> bool {
        self.state.read().get(name).copied().unwrap_or(false)
    }

    pub fn healthy_count(&self) -> usize {
        self.state.read().values().filter(|healthy| **healthy).count()
    }

    pub fn total_count(&self) -> usize {
        self.state.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_every_source_healthy() {
        let health = SourceHealth::new(["spotify".to_string(), "apple".to_string()]);
        assert_eq!(health.healthy_count(), 2);
    }

    #[test]
    fn recording_unhealthy_lowers_the_count() {
        let health = SourceHealth::new(["spotify".to_string(), "apple".to_string()]);
        health.record("spotify", false);
        assert_eq!(health.healthy_count(), 1);
        assert!(!health.is_healthy("spotify"));
        assert!(health.is_healthy("apple"));
    }
}
