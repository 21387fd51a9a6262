//! The multi-source fallback coordinator (C5): try the primary upstream
//! directly by id, and on denial or failure, search the remaining sources
//! in configured order, matching search results against `(name, artist)`.
//!
//! # Example
//!
//! ```
//! use cadence_core::Context;
//! use cadence_fallback::FallbackCoordinator;
//! use cadence_upstream::{MockUpstreamAdapter, Song};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let primary = Arc::new(MockUpstreamAdapter::new("spotify"));
//! let secondary = Arc::new(MockUpstreamAdapter::new("apple-music").with_search_results(
//!     "yesterday",
//!     "the beatles",
//!     vec![Song { id: "7".into(), name: "Yesterday".into(), artist: "The Beatles".into(), content_url: None }],
//! ).with_song("7", Song { id: "7".into(), name: "Yesterday".into(), artist: "The Beatles".into(), content_url: Some("https://cdn/7".into()) }));
//!
//! let coordinator = FallbackCoordinator::new(vec![primary, secondary]);
//! let ctx = Context::background();
//! let result = coordinator.resolve(&ctx, None, "yesterday", "the beatles").await.unwrap();
//! assert_eq!(result.source, "apple-music");
//! # }
//! ```

mod health;
mod ranking;

pub use health::SourceHealth;
pub use ranking::best_match;

use cadence_core::{Context, GatewayError};
use cadence_upstream::{Song, UpstreamAdapter};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::debug;

/// A resolved song plus which source it came from.
#[derive(Debug, Clone)]
pub struct FallbackResult {
    pub song: Song,
    pub source: String,
}

/// An ordered chain of upstreams, first is primary. Order is configured
/// once and stable for the coordinator's lifetime.
pub struct FallbackCoordinator {
    chain: Vec<Arc<dyn UpstreamAdapter>>,
    health: SourceHealth,
}

impl FallbackCoordinator {
    pub fn new(chain: Vec<Arc<dyn UpstreamAdapter>>) -> Self {
        let health = SourceHealth::new(chain.iter().map(|upstream| upstream.name().to_string()));
        Self { chain, health }
    }

    pub fn health(&self) -> &SourceHealth {
        &self.health
    }

    /// Resolves `(name, artist)`, trying `primary_id` against the primary
    /// upstream first when given, then searching the rest of the chain in
    /// order. Returns `NotFoundAnySource` with the accumulated per-source
    /// errors if nothing in the chain could serve the request.
    pub async fn resolve(
        &self,
        ctx: &Context,
        primary_id: Option<&str>,
        name: &str,
        artist: &str,
    ) -> Result<FallbackResult, GatewayError> {
        if self.chain.is_empty() {
            return Err(GatewayError::NotFoundAnySource { per_source: vec![] });
        }

        let mut per_source = Vec::new();
        let mut remaining = self.chain.iter();

        if let Some(id) = primary_id {
            let primary = remaining
                .next()
                .expect("chain is non-empty, checked above");

            if ctx.is_cancelled() {
                return Err(GatewayError::ContextCancelled);
            }

            match primary.fetch_by_id(ctx, id).await {
                Ok(song) => {
                    self.health.record(primary.name(), true);
                    return Ok(FallbackResult {
                        song,
                        source: primary.name().to_string(),
                    });
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    debug!(source = %primary.name(), error = %err, "fallback: primary denied or failed");
                    self.health.record(primary.name(), !is_fatal(&err));
                    per_source.push((primary.name().to_string(), Box::new(err)));
                }
            }
        }

        for upstream in remaining {
            if ctx.is_cancelled() {
                return Err(GatewayError::ContextCancelled);
            }

            match self.try_source(ctx, upstream.as_ref(), name, artist).await {
                Ok(song) => {
                    self.health.record(upstream.name(), true);
                    return Ok(FallbackResult {
                        song,
                        source: upstream.name().to_string(),
                    });
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    debug!(source = %upstream.name(), error = %err, "fallback: source exhausted");
                    self.health.record(upstream.name(), !is_fatal(&err));
                    per_source.push((upstream.name().to_string(), Box::new(err)));
                }
            }
        }

        Err(GatewayError::NotFoundAnySource { per_source })
    }

    async fn try_source(
        &self,
        ctx: &Context,
        upstream: &dyn UpstreamAdapter,
        name: &str,
        artist: &str,
    ) -> Result<Song, GatewayError> {
        let candidates = upstream.search_by_name_artist(ctx, name, artist).await?;
        let best = best_match(&candidates, name, artist).ok_or_else(|| GatewayError::NotFound {
            upstream: upstream.name().to_string(),
        })?;
        upstream.fetch_by_id(ctx, &best.id).await
    }
}

/// Whether an error reflects genuine source trouble (counts against source
/// health) as opposed to a normal not-found/content-unavailable outcome.
fn is_fatal(err: &GatewayError) -> bool {
    !matches!(
        err,
        GatewayError::NotFound { .. } | GatewayError::ContentUnavailable { .. }
    )
}
