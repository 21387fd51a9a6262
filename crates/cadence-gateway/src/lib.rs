//! The request orchestrator (C7): binds cache-key derivation, the tiered
//! cache, the per-upstream pipeline, and the fallback coordinator behind
//! one call, plus the axum HTTP surface that exercises it.

pub mod config;
pub mod http;
pub mod orchestrator;
pub mod resource;

pub use config::GatewayConfig;
pub use orchestrator::{ContentUrlPayload, FetchResult, Orchestrator};
pub use resource::{cache_key, Annotation, Envelope, FetchRequest, ResourceKind, TtlConfig};
