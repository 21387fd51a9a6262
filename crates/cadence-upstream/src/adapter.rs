//! The capability every upstream must expose to participate in the fallback
//! chain: fetch by id, search by name/artist, and a cheap health probe.

use cadence_core::{Context, GatewayError};
use serde::{Deserialize, Serialize};

/// A unified song record, the common shape every upstream's response is
/// reduced to. `content_url` is absent for catalog-only results (e.g. a
/// search hit that hasn't been resolved to a playable URL yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub content_url: Option<String>,
}

/// Per-upstream capability: by-id fetch, name/artist search, health probe.
/// `cadence-fallback` drives the chain entirely through this trait, never
/// touching a concrete upstream type.
#[async_trait::async_trait]
pub trait UpstreamAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Resolves a direct, upstream-native id to a playable record.
    /// `GatewayError::ContentUnavailable` signals a non-fatal demotion to
    /// fallback (region-locked, premium-gated, ...); any other error is
    /// either retryable-at-this-layer or a fatal upstream error.
    async fn fetch_by_id(&self, ctx: &Context, id: &str) -> Result<Song, GatewayError>;

    /// Searches by `(name, artist)`, returning candidates in the order the
    /// upstream ranked them.
    async fn search_by_name_artist(
        &self,
        ctx: &Context,
        name: &str,
        artist: &str,
    ) -> Result<Vec<Song>, GatewayError>;

    /// A cheap liveness probe, independent of the breaker's own state.
    async fn health_probe(&self, ctx: &Context) -> Result<(), GatewayError>;
}
