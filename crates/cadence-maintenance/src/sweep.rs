//! Scheduled L1 expiry sweep: reclaims space held by expired entries that
//! an idle key would otherwise leave resident until its next (never) read.

use cadence_core::Context;
use cadence_l1cache::L1Cache;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Runs [`L1Cache::sweep_expired`] on a fixed interval until cancelled.
pub struct SweepScheduler {
    l1: Arc<L1Cache>,
    interval: Duration,
}

impl SweepScheduler {
    pub fn new(l1: Arc<L1Cache>, interval: Duration) -> Self {
        Self { l1, interval }
    }

    pub async fn run(&self, ctx: &Context) {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return,
                _ = ticker.tick() => {
                    let _swept = self.l1.sweep_expired();
                    #[cfg(feature = "tracing")]
                    debug!(swept = _swept, "l1 sweep pass complete");
                }
            }
        }
    }
}
