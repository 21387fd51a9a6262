//! Layered configuration: built-in defaults, overridden by an optional TOML
//! file, overridden by `CADENCE_`-prefixed environment variables.

use cadence_breaker::BreakerConfig;
use cadence_retry::RetryConfig;
use cadence_upstream::{RateLimitConfig, UpstreamDescriptor};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the gateway binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub maintenance: MaintenanceConfig,
    /// First entry is the primary upstream; the rest make up the fallback
    /// chain, tried in order.
    pub upstreams: Vec<UpstreamConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub redis_prefix: String,
    pub l1_max_size: usize,
    pub l1_ttl_secs: u64,
    pub stale_ttl_secs: u64,
    pub ttl_content_url_secs: u64,
    pub ttl_catalog_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_prefix: "cadence".to_string(),
            l1_max_size: 10_000,
            l1_ttl_secs: 30,
            stale_ttl_secs: 24 * 60 * 60,
            ttl_content_url_secs: 300,
            ttl_catalog_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub warmup_interval_secs: u64,
    pub sweep_interval_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            warmup_interval_secs: 3600,
            sweep_interval_secs: 120,
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub name: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub rate_limit_capacity: u32,
    pub rate_limit_refill_per_sec: f64,
    pub breaker_max_failures: u64,
    pub breaker_cooldown_secs: u64,
    pub breaker_probe_budget: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_wait_ms: u64,
    pub retry_max_wait_ms: u64,
    pub retry_multiplier: f64,
    pub credentials: Option<String>,
}

impl From<&UpstreamConfig> for UpstreamDescriptor {
    fn from(config: &UpstreamConfig) -> Self {
        UpstreamDescriptor {
            name: config.name.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            rate_limit: RateLimitConfig {
                capacity: config.rate_limit_capacity,
                refill_per_sec: config.rate_limit_refill_per_sec,
            },
            breaker: BreakerConfig {
                max_failures: config.breaker_max_failures,
                cooldown: Duration::from_secs(config.breaker_cooldown_secs),
                probe_budget: config.breaker_probe_budget,
            },
            retry: RetryConfig {
                max_attempts: config.retry_max_attempts,
                initial_wait: Duration::from_millis(config.retry_initial_wait_ms),
                max_wait: Duration::from_millis(config.retry_max_wait_ms),
                multiplier: config.retry_multiplier,
            },
            credentials: config.credentials.clone(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            maintenance: MaintenanceConfig::default(),
            upstreams: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Loads defaults, then `path` if it exists, then `CADENCE_`-prefixed
    /// environment variables (nested keys via `__`, e.g.
    /// `CADENCE_SERVER__LISTEN_ADDR`).
    pub fn load(path: Option<&str>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(GatewayConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("CADENCE_").split("__"));
        figment.extract()
    }
}
