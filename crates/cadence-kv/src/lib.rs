//! The L2 tier: a namespaced remote KV adapter over Redis.
//!
//! This is the shared, fleet-wide tier the tiered cache in `cadence-cache`
//! falls back to on an L1 miss. The adapter owns key namespacing and TTL
//! but never introspects the bytes it stores — whatever the caller hands it
//! comes back unchanged.
//!
//! # Example
//!
//! ```no_run
//! use cadence_kv::KvAdapter;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let kv = KvAdapter::connect("redis://127.0.0.1:6379", "song-cache").await?;
//! kv.set("song:42", b"...", Duration::from_secs(300)).await?;
//! let value = kv.get("song:42").await?;
//! # Ok(())
//! # }
//! ```

use cadence_core::GatewayError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

fn namespaced_key(prefix: &str, key: &str) -> String {
    format!("{prefix}:{key}")
}

fn store_fault(context: &str, err: redis::RedisError) -> GatewayError {
    GatewayError::StoreFault(format!("{context}: {err}"))
}

/// A namespaced Redis-backed KV adapter.
///
/// Cloning is cheap: [`ConnectionManager`] is itself a lightweight handle
/// that reconnects transparently, so every call here clones it rather than
/// holding a lock across a round-trip.
#[derive(Clone)]
pub struct KvAdapter {
    conn: ConnectionManager,
    prefix: String,
}

impl KvAdapter {
    /// Opens a connection to `redis_url` and namespaces every key under
    /// `prefix`. Fails if the initial connection cannot be established.
    pub async fn connect(redis_url: &str, prefix: impl Into<String>) -> Result<Self, GatewayError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| store_fault("opening redis client", e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| store_fault("establishing redis connection manager", e))?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn key(&self, key: &str) -> String {
        namespaced_key(&self.prefix, key)
    }

    /// Reuses this adapter's connection under a different namespace prefix.
    ///
    /// Lets a caller derive, say, a `"stale"`-prefixed adapter for a
    /// long-horizon reserve without opening a second connection.
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Self {
        Self {
            conn: self.conn.clone(),
            prefix: prefix.into(),
        }
    }

    /// Fetches `key`. A genuine miss is [`GatewayError::CacheMiss`]; any
    /// other failure is [`GatewayError::StoreFault`].
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, GatewayError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .get(self.key(key))
            .await
            .map_err(|e| store_fault("GET", e))?;
        value.ok_or(GatewayError::CacheMiss)
    }

    /// Writes `key` with `ttl`, overwriting any existing value.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.key(key), value, ttl.as_secs().max(1))
            .await
            .map_err(|e| store_fault("SETEX", e))?;
        #[cfg(feature = "tracing")]
        debug!(key, ttl_secs = ttl.as_secs(), "l2: set");
        Ok(())
    }

    /// Removes `key`. Idempotent — absence is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(key)).await.map_err(|e| store_fault("DEL", e))?;
        Ok(())
    }

    /// Fetches every key in `keys`, skipping the ones that miss. The
    /// returned map is keyed by the caller's original (unprefixed) keys.
    pub async fn mget(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>, GatewayError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.conn.clone();
        let namespaced: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        let values: Vec<Option<Vec<u8>>> = conn
            .mget(&namespaced)
            .await
            .map_err(|e| store_fault("MGET", e))?;

        Ok(keys
            .iter()
            .zip(values)
            .filter_map(|(k, v)| v.map(|v| (k.clone(), v)))
            .collect())
    }

    /// Writes every entry in `entries` with `ttl`, pipelined.
    ///
    /// The contract is "each entry is eventually written or an error is
    /// returned" — a pipeline failure surfaces before any partial result is
    /// reported as success.
    pub async fn mset(&self, entries: &[(String, Vec<u8>)], ttl: Duration) -> Result<(), GatewayError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        let ttl_secs = ttl.as_secs().max(1);
        for (key, value) in entries {
            pipe.set_ex(self.key(key), value, ttl_secs);
        }
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| store_fault("pipelined MSET", e))
    }

    /// True if `key` is present (and unexpired).
    pub async fn exists(&self, key: &str) -> Result<bool, GatewayError> {
        let mut conn = self.conn.clone();
        conn.exists(self.key(key))
            .await
            .map_err(|e| store_fault("EXISTS", e))
    }

    /// Remaining TTL for `key`. `CacheMiss` if the key does not exist.
    pub async fn ttl(&self, key: &str) -> Result<Duration, GatewayError> {
        let mut conn = self.conn.clone();
        let ttl_secs: i64 = conn.ttl(self.key(key)).await.map_err(|e| store_fault("TTL", e))?;
        if ttl_secs < 0 {
            return Err(GatewayError::CacheMiss);
        }
        Ok(Duration::from_secs(ttl_secs as u64))
    }

    /// Round-trips a `PING`, used by the maintenance layer's readiness check.
    pub async fn ping(&self) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| store_fault("PING", e))?;
        Ok(())
    }
}
