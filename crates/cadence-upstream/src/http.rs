//! HTTP-backed [`UpstreamAdapter`], driven through a [`Pipeline`].

use crate::adapter::{Song, UpstreamAdapter};
use crate::descriptor::UpstreamDescriptor;
use crate::pipeline::Pipeline;
use cadence_core::{Context, GatewayError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

#[cfg(feature = "tracing")]
use tracing::warn;

/// The wire shape every upstream's by-id/search response is reduced to.
/// `available: false` is the upstream's "can't be served here" sentinel —
/// a normal, non-error outcome that demotes to fallback rather than
/// counting as a breaker failure.
#[derive(Debug, Deserialize)]
struct UpstreamSongPayload {
    id: String,
    name: String,
    artist: String,
    content_url: Option<String>,
    #[serde(default = "default_available")]
    available: bool,
}

fn default_available() -> bool {
    true
}

impl UpstreamSongPayload {
    fn into_song(self, upstream: &str) -> Result<Song, GatewayError> {
        if !self.available {
            return Err(GatewayError::ContentUnavailable {
                upstream: upstream.to_string(),
                reason: "upstream reported content unavailable".to_string(),
            });
        }
        Ok(Song {
            id: self.id,
            name: self.name,
            artist: self.artist,
            content_url: self.content_url,
        })
    }
}

pub struct HttpUpstreamAdapter {
    descriptor: UpstreamDescriptor,
    client: Client,
    pipeline: Pipeline,
}

impl HttpUpstreamAdapter {
    pub fn new(descriptor: UpstreamDescriptor) -> Self {
        let client = Client::builder()
            .timeout(descriptor.timeout)
            .build()
            .expect("reqwest client configuration is always valid");
        let pipeline = Pipeline::new(&descriptor);
        Self {
            descriptor,
            client,
            pipeline,
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.descriptor.credentials {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        ctx: &Context,
        url: String,
    ) -> Result<T, GatewayError> {
        let upstream = self.descriptor.name.clone();
        self.pipeline
            .call(ctx, || {
                let upstream = upstream.clone();
                let request = self.authorize(self.client.get(&url));
                async move {
                    let response = request.send().await.map_err(|err| {
                        if err.is_timeout() {
                            GatewayError::Timeout {
                                upstream: upstream.clone(),
                            }
                        } else {
                            GatewayError::UpstreamUnavailable {
                                upstream: upstream.clone(),
                                status: 0,
                            }
                        }
                    })?;

                    classify_status(&upstream, response.status())?;

                    response.json::<T>().await.map_err(|_err| {
                        #[cfg(feature = "tracing")]
                        warn!(upstream = %upstream, "upstream response body did not parse");
                        GatewayError::UpstreamUnavailable {
                            upstream: upstream.clone(),
                            status: 200,
                        }
                    })
                }
            })
            .await
    }
}

fn classify_status(upstream: &str, status: StatusCode) -> Result<(), GatewayError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound {
            upstream: upstream.to_string(),
        });
    }
    if status.is_server_error() {
        return Err(GatewayError::UpstreamUnavailable {
            upstream: upstream.to_string(),
            status: status.as_u16(),
        });
    }
    Err(GatewayError::UpstreamRejected {
        upstream: upstream.to_string(),
        status: status.as_u16(),
    })
}

#[async_trait::async_trait]
impl UpstreamAdapter for HttpUpstreamAdapter {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    async fn fetch_by_id(&self, ctx: &Context, id: &str) -> Result<Song, GatewayError> {
        let url = format!("{}/songs/{id}", self.descriptor.base_url);
        let payload: UpstreamSongPayload = self.get_json(ctx, url).await?;
        payload.into_song(&self.descriptor.name)
    }

    async fn search_by_name_artist(
        &self,
        ctx: &Context,
        name: &str,
        artist: &str,
    ) -> Result<Vec<Song>, GatewayError> {
        let url = format!(
            "{}/search?name={}&artist={}",
            self.descriptor.base_url,
            urlencoding_encode(name),
            urlencoding_encode(artist),
        );
        let payloads: Vec<UpstreamSongPayload> = self.get_json(ctx, url).await?;
        Ok(payloads
            .into_iter()
            .filter_map(|payload| payload.into_song(&self.descriptor.name).ok())
            .collect())
    }

    async fn health_probe(&self, ctx: &Context) -> Result<(), GatewayError> {
        let url = format!("{}/health", self.descriptor.base_url);
        let upstream = self.descriptor.name.clone();
        self.pipeline
            .call(ctx, || {
                let request = self.authorize(self.client.get(&url));
                let upstream = upstream.clone();
                async move {
                    let response = request.send().await.map_err(|_err| GatewayError::Timeout {
                        upstream: upstream.clone(),
                    })?;
                    classify_status(&upstream, response.status())
                }
            })
            .await
    }
}

/// Minimal query-param percent-encoding; upstream names/artists are
/// free-text and need at least space/`&`/`?` escaped.
fn urlencoding_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_breaker::BreakerConfig;
    use cadence_retry::RetryConfig;
    use crate::descriptor::RateLimitConfig;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn descriptor(base_url: String) -> UpstreamDescriptor {
        UpstreamDescriptor {
            name: "spotify".to_string(),
            base_url,
            timeout: Duration::from_secs(2),
            rate_limit: RateLimitConfig {
                capacity: 10,
                refill_per_sec: 10.0,
            },
            breaker: BreakerConfig {
                max_failures: 5,
                cooldown: Duration::from_secs(30),
                probe_budget: 3,
            },
            retry: RetryConfig {
                max_attempts: 1,
                initial_wait: Duration::from_millis(1),
                max_wait: Duration::from_millis(5),
                multiplier: 2.0,
            },
            credentials: None,
        }
    }

    #[tokio::test]
    async fn fetch_by_id_returns_the_unified_song() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/songs/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "42",
                "name": "Track",
                "artist": "Artist",
                "content_url": "https://cdn.example/42.mp3",
            })))
            .mount(&server)
            .await;

        let adapter = HttpUpstreamAdapter::new(descriptor(server.uri()));
        let ctx = Context::background();
        let song = adapter.fetch_by_id(&ctx, "42").await.unwrap();
        assert_eq!(song.id, "42");
        assert_eq!(song.content_url.as_deref(), Some("https://cdn.example/42.mp3"));
    }

    #[tokio::test]
    async fn unavailable_sentinel_maps_to_content_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/songs/99"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "99",
                "name": "Locked",
                "artist": "Artist",
                "content_url": null,
                "available": false,
            })))
            .mount(&server)
            .await;

        let adapter = HttpUpstreamAdapter::new(descriptor(server.uri()));
        let ctx = Context::background();
        let result = adapter.fetch_by_id(&ctx, "99").await;
        assert!(matches!(result, Err(GatewayError::ContentUnavailable { .. })));
    }

    #[tokio::test]
    async fn not_found_status_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/songs/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = HttpUpstreamAdapter::new(descriptor(server.uri()));
        let ctx = Context::background();
        let result = adapter.fetch_by_id(&ctx, "missing").await;
        assert!(matches!(result, Err(GatewayError::NotFound { .. })));
    }

    #[tokio::test]
    async fn server_error_maps_to_upstream_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/songs/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = HttpUpstreamAdapter::new(descriptor(server.uri()));
        let ctx = Context::background();
        let result = adapter.fetch_by_id(&ctx, "flaky").await;
        assert!(matches!(
            result,
            Err(GatewayError::UpstreamUnavailable { status: 503, .. })
        ));
    }
}
