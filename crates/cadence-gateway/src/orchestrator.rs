//! The request orchestrator (C7): binds cache-key derivation, the tiered
//! cache's loader, the per-upstream pipeline, and the fallback coordinator
//! into the one call every HTTP handler drives.

use crate::resource::{cache_key, Annotation, FetchRequest, ResourceKind, TtlConfig};
use cadence_cache::TieredCache;
use cadence_core::{Context, GatewayError};
use cadence_fallback::FallbackCoordinator;
use cadence_upstream::{Song, UpstreamAdapter};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A resolved content URL plus which source served it, the shape written
/// into the cache and returned to the caller for `ResourceKind::ContentUrl`.
#[derive(Debug, Clone, Serialize)]
pub struct ContentUrlPayload {
    pub song: Song,
    pub source: String,
}

/// The bytes produced by a fetch, plus where they came from.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub bytes: Vec<u8>,
    pub annotation: Annotation,
}

/// Composes the tiered cache, the primary upstream (for catalog reads),
/// and the fallback chain (for content-url reads) behind one entry point.
pub struct Orchestrator {
    cache: Arc<TieredCache>,
    primary: Arc<dyn UpstreamAdapter>,
    fallback: Arc<FallbackCoordinator>,
    ttl: TtlConfig,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<TieredCache>,
        primary: Arc<dyn UpstreamAdapter>,
        fallback: Arc<FallbackCoordinator>,
        ttl: TtlConfig,
    ) -> Self {
        Self {
            cache,
            primary,
            fallback,
            ttl,
        }
    }

    /// Runs one read per the design's data flow: cache key → tiered cache
    /// with loader → (pipeline, or pipeline+fallback) → annotated result.
    pub async fn fetch(&self, ctx: &Context, request: FetchRequest) -> Result<FetchResult, GatewayError> {
        let key = cache_key(
            request.kind,
            request.id.as_deref(),
            &request.name,
            &request.artist,
        );
        let ttl = self.ttl.for_kind(request.kind);
        let invoked = Arc::new(AtomicBool::new(false));

        let loaded = match request.kind {
            ResourceKind::ContentUrl => {
                self.load_content_url(ctx, &key, &request, Arc::clone(&invoked), ttl).await?
            }
            ResourceKind::Catalog => {
                self.load_catalog(ctx, &key, &request, Arc::clone(&invoked), ttl).await?
            }
        };

        let annotation = if loaded.served_stale {
            Annotation::FromStale
        } else if invoked.load(Ordering::Relaxed) {
            Annotation::FromUpstream
        } else {
            Annotation::FromCache
        };

        Ok(FetchResult {
            bytes: loaded.value,
            annotation,
        })
    }

    async fn load_content_url(
        &self,
        ctx: &Context,
        key: &str,
        request: &FetchRequest,
        invoked: Arc<AtomicBool>,
        ttl: std::time::Duration,
    ) -> Result<cadence_cache::LoadResult, GatewayError> {
        let fallback = Arc::clone(&self.fallback);
        let loader_ctx = ctx.child();
        let id = request.id.clone();
        let name = request.name.clone();
        let artist = request.artist.clone();

        self.cache
            .get_or_load(
                ctx,
                key,
                move || {
                    invoked.store(true, Ordering::Relaxed);
                    async move {
                        let resolved = fallback
                            .resolve(&loader_ctx, id.as_deref(), &name, &artist)
                            .await?;
                        serialize(&ContentUrlPayload {
                            song: resolved.song,
                            source: resolved.source,
                        })
                    }
                },
                ttl,
            )
            .await
    }

    async fn load_catalog(
        &self,
        ctx: &Context,
        key: &str,
        request: &FetchRequest,
        invoked: Arc<AtomicBool>,
        ttl: std::time::Duration,
    ) -> Result<cadence_cache::LoadResult, GatewayError> {
        let primary = Arc::clone(&self.primary);
        let loader_ctx = ctx.child();
        let name = request.name.clone();
        let artist = request.artist.clone();

        self.cache
            .get_or_load(
                ctx,
                key,
                move || {
                    invoked.store(true, Ordering::Relaxed);
                    async move {
                        let songs = primary.search_by_name_artist(&loader_ctx, &name, &artist).await?;
                        serialize(&songs)
                    }
                },
                ttl,
            )
            .await
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, GatewayError> {
    serde_json::to_vec(value).map_err(|err| GatewayError::StoreFault(format!("serializing fetch result: {err}")))
}
