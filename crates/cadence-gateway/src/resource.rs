//! Resource kinds, the pure cache-key derivation the orchestrator uses to
//! turn a request into a tiered-cache key, and the uniform JSON envelope
//! every HTTP response is wrapped in.

use serde::Serialize;
use std::time::Duration;

/// What kind of thing a request is asking for. Drives both the TTL applied
/// to the cached result and whether the fallback chain runs at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A playable URL for one song: primary upstream, then the full
    /// fallback chain on denial or failure.
    ContentUrl,
    /// Search/list/detail results: primary upstream only, no fallback.
    Catalog,
}

impl ResourceKind {
    fn tag(self) -> &'static str {
        match self {
            ResourceKind::ContentUrl => "content",
            ResourceKind::Catalog => "catalog",
        }
    }
}

/// The inputs to one orchestrator fetch. `id` is the primary upstream's
/// native identifier, when the caller already has one; `name`/`artist`
/// are always required since they double as the fallback match key.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub kind: ResourceKind,
    pub id: Option<String>,
    pub name: String,
    pub artist: String,
}

/// Where the bytes returned by a fetch ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    FromCache,
    FromUpstream,
    FromStale,
}

/// Derives a cache key from `(kind, id, name, artist)`. Pure: the same
/// inputs always yield the same key, independent of process or version —
/// callers must not fold in anything time- or instance-dependent.
pub fn cache_key(kind: ResourceKind, id: Option<&str>, name: &str, artist: &str) -> String {
    match id {
        Some(id) => format!("{}:id:{id}", kind.tag()),
        None => format!(
            "{}:na:{}:{}",
            kind.tag(),
            name.to_lowercase(),
            artist.to_lowercase()
        ),
    }
}

/// Per-kind TTLs, chosen at configuration time; the orchestrator never
/// mutates them mid-flight.
#[derive(Debug, Clone, Copy)]
pub struct TtlConfig {
    pub content_url: Duration,
    pub catalog: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            content_url: Duration::from_secs(300),
            catalog: Duration::from_secs(3600),
        }
    }
}

impl TtlConfig {
    pub fn for_kind(&self, kind: ResourceKind) -> Duration {
        match kind {
            ResourceKind::ContentUrl => self.content_url,
            ResourceKind::Catalog => self.catalog,
        }
    }
}

/// The uniform response shape every endpoint returns: `code` is `1` on
/// success and the error's business code otherwise, `data` carries the
/// payload (or `null` on error), and `request_id` always echoes the id the
/// caller sent (or one generated for them, if they didn't).
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
    pub request_id: String,
}

impl<T> Envelope<T> {
    pub const SUCCESS_CODE: i32 = 1;

    pub fn success(data: T, request_id: String) -> Self {
        Self {
            code: Self::SUCCESS_CODE,
            message: "ok".to_string(),
            data,
            request_id,
        }
    }
}

impl Envelope<serde_json::Value> {
    pub fn error(code: i32, message: String, request_id: String) -> Self {
        Self {
            code,
            message,
            data: serde_json::Value::Null,
            request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_yield_the_same_key() {
        let a = cache_key(ResourceKind::ContentUrl, Some("42"), "Yesterday", "The Beatles");
        let b = cache_key(ResourceKind::ContentUrl, Some("42"), "Yesterday", "The Beatles");
        assert_eq!(a, b);
    }

    #[test]
    fn content_url_and_catalog_keys_never_collide() {
        let content = cache_key(ResourceKind::ContentUrl, None, "Yesterday", "The Beatles");
        let catalog = cache_key(ResourceKind::Catalog, None, "Yesterday", "The Beatles");
        assert_ne!(content, catalog);
    }

    #[test]
    fn name_artist_key_is_case_insensitive() {
        let a = cache_key(ResourceKind::Catalog, None, "Yesterday", "The Beatles");
        let b = cache_key(ResourceKind::Catalog, None, "yesterday", "the beatles");
        assert_eq!(a, b);
    }

    #[test]
    fn success_envelope_uses_the_code_one_sentinel() {
        let envelope = Envelope::success(serde_json::json!({"ok": true}), "req-1".to_string());
        assert_eq!(envelope.code, Envelope::<()>::SUCCESS_CODE);
        assert_eq!(envelope.request_id, "req-1");
    }

    #[test]
    fn error_envelope_carries_a_non_one_code_and_null_data() {
        let envelope = Envelope::error(1404, "not found".to_string(), "req-2".to_string());
        assert_ne!(envelope.code, Envelope::<()>::SUCCESS_CODE);
        assert_eq!(envelope.data, serde_json::Value::Null);
    }
}
