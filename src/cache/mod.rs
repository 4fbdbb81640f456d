//! Key-value store with native per-key expiry.
//!
//! Sessions live here. The store is selected at startup: [`MemoryStore`] for
//! single-process deployments and tests, or `RedisStore` when the crate is
//! built with the `redis` feature.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{CacheBackend, CacheConfig};
use crate::Result;

/// Async key-value store with per-key TTL.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored at `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` at `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// Health check.
    async fn is_alive(&self) -> bool;

    /// Release the connection. Later operations fail.
    async fn close(&self);
}

/// Connect the store described by `config`.
pub async fn connect(config: &CacheConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "redis")]
        CacheBackend::Redis => Ok(Arc::new(RedisStore::connect(&config.url).await?)),
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => Err(crate::FilesError::Config(
            "redis backend requires the `redis` feature".to_string(),
        )),
    }
}
