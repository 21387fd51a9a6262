//! An in-memory [`UpstreamAdapter`] for tests that don't need a real HTTP
//! round-trip — `cadence-fallback`'s own suite is built on this.

use crate::adapter::{Song, UpstreamAdapter};
use cadence_core::{Context, GatewayError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockUpstreamAdapter {
    name: String,
    songs_by_id: Mutex<HashMap<String, Song>>,
    search_results: Mutex<HashMap<(String, String), Vec<Song>>>,
    healthy: Mutex<bool>,
    content_unavailable: Mutex<bool>,
    fetch_by_id_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MockUpstreamAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            songs_by_id: Mutex::new(HashMap::new()),
            search_results: Mutex::new(HashMap::new()),
            healthy: Mutex::new(true),
            content_unavailable: Mutex::new(false),
            fetch_by_id_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_song(self, id: impl Into<String>, song: Song) -> Self {
        self.songs_by_id.lock().insert(id.into(), song);
        self
    }

    pub fn with_search_results(
        self,
        name: impl Into<String>,
        artist: impl Into<String>,
        songs: Vec<Song>,
    ) -> Self {
        self.search_results
            .lock()
            .insert((name.into(), artist.into()), songs);
        self
    }

    /// Makes every `fetch_by_id` call on this adapter fail with
    /// `ContentUnavailable`, regardless of whether the id is configured.
    pub fn with_content_unavailable(self) -> Self {
        *self.content_unavailable.lock() = true;
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock() = healthy;
    }

    /// Number of times `fetch_by_id` has been called on this adapter.
    pub fn fetch_by_id_calls(&self) -> usize {
        self.fetch_by_id_calls.load(Ordering::SeqCst)
    }

    /// Number of times `search_by_name_artist` has been called on this adapter.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl UpstreamAdapter for MockUpstreamAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_by_id(&self, _ctx: &Context, id: &str) -> Result<Song, GatewayError> {
        self.fetch_by_id_calls.fetch_add(1, Ordering::SeqCst);

        if *self.content_unavailable.lock() {
            return Err(GatewayError::ContentUnavailable {
                upstream: self.name.clone(),
                reason: "mock configured unavailable".to_string(),
            });
        }

        self.songs_by_id
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                upstream: self.name.clone(),
            })
    }

    async fn search_by_name_artist(
        &self,
        _ctx: &Context,
        name: &str,
        artist: &str,
    ) -> Result<Vec<Song>, GatewayError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .search_results
            .lock()
            .get(&(name.to_string(), artist.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn health_probe(&self, _ctx: &Context) -> Result<(), GatewayError> {
        if *self.healthy.lock() {
            Ok(())
        } else {
            Err(GatewayError::UpstreamUnavailable {
                upstream: self.name.clone(),
                status: 0,
            })
        }
    }
}
