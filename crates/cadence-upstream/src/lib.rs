//! The per-upstream resilience pipeline (C4): rate limiter → circuit
//! breaker → retrying HTTP call, plus the [`UpstreamAdapter`] capability
//! every upstream exposes to the fallback coordinator.
//!
//! # Example
//!
//! ```
//! use cadence_core::Context;
//! use cadence_upstream::{MockUpstreamAdapter, Song, UpstreamAdapter};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let spotify = MockUpstreamAdapter::new("spotify").with_song(
//!     "42",
//!     Song { id: "42".into(), name: "Track".into(), artist: "Artist".into(), content_url: Some("https://cdn/42".into()) },
//! );
//!
//! let ctx = Context::background();
//! let song = spotify.fetch_by_id(&ctx, "42").await.unwrap();
//! assert_eq!(song.name, "Track");
//! # }
//! ```

mod adapter;
mod descriptor;
mod http;
mod mock;
mod pipeline;

pub use adapter::{Song, UpstreamAdapter};
pub use descriptor::{RateLimitConfig, UpstreamDescriptor};
pub use http::HttpUpstreamAdapter;
pub use mock::MockUpstreamAdapter;
pub use pipeline::Pipeline;
