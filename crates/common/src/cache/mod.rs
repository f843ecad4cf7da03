//! Query result caching
//!
//! Provides:
//! - A `CacheStore` seam with an in-process (moka) and a Redis backend
//! - Typed get/set on top of JSON-serialized values
//! - Sliding expiration: every hit renews the entry's lifetime
//! - Fixed per-entity keys, evicted wholesale on every write
//!
//! The cache is a plain value built once at startup and handed to whoever needs
//! it; there is no global instance.

mod memory;
mod redis_store;

pub use self::memory::MemoryCacheStore;
pub use self::redis_store::RedisCacheStore;

use crate::config::{CacheBackend, CacheConfig};
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Raw key/value storage behind [`Cache`].
///
/// Implementations apply their configured sliding expiration on both `set`
/// and `get`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value, renewing its expiration on hit.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove a key; returns whether an entry was present.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Check backend connectivity.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Typed cache handle shared by the repositories.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    /// Wrap an existing store
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// In-process cache with the given capacity and sliding expiration
    pub fn in_memory(max_capacity: u64, sliding_ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new(max_capacity, sliding_ttl)))
    }

    /// Build the backend selected in configuration
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        match config.backend {
            CacheBackend::Memory => Ok(Self::in_memory(config.max_capacity, config.sliding_ttl())),
            CacheBackend::Redis => {
                let url = config.redis_url.as_deref().ok_or_else(|| AppError::Configuration {
                    message: "cache.redis_url is required when cache.backend = \"redis\"".to_string(),
                })?;
                let store = RedisCacheStore::connect(url, &config.key_prefix, config.sliding_ttl()).await?;
                Ok(Self::new(Arc::new(store)))
            }
        }
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| AppError::CacheError {
                    message: format!("Failed to parse cached value for '{}': {}", key, e),
                })?;
                debug!(key, "Cache hit");
                metrics::record_cache(true, key);
                Ok(Some(parsed))
            }
            None => {
                debug!(key, "Cache miss");
                metrics::record_cache(false, key);
                Ok(None)
            }
        }
    }

    /// Set a value in cache
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(|e| AppError::CacheError {
            message: format!("Failed to serialize value: {}", e),
        })?;

        self.store.set(key, json).await?;
        debug!(key, "Cache set");
        Ok(())
    }

    /// Evict a key. Called after every committed write.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let removed = self.store.remove(key).await?;
        debug!(key, removed, "Cache evict");
        Ok(removed)
    }

    /// Get or set with a loader function. An unreadable cache falls back to the loader.
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, loader: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        // Try to get from cache first
        match self.get::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(error = %e, key, "Cache read failed, loading from source"),
        }

        // Load from source
        let value = loader().await?;

        // Cache the result
        if let Err(e) = self.set(key, &value).await {
            warn!(error = %e, key, "Failed to cache value, continuing without cache");
        }

        Ok(value)
    }

    /// Check backend connectivity
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

/// Cache keys, one per entity type
pub mod keys {
    pub const CASES: &str = "caseRecords";
    pub const DOCUMENTS: &str = "documentRecords";
    pub const MESSAGES: &str = "messageRecords";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Store that refuses selected operations, for exercising cache faults
#[cfg(test)]
pub(crate) struct FaultyStore {
    inner: MemoryCacheStore,
    fail_get: bool,
    fail_remove: bool,
}

#[cfg(test)]
impl FaultyStore {
    pub(crate) fn failing_get() -> Self {
        Self {
            inner: MemoryCacheStore::new(100, Duration::from_secs(600)),
            fail_get: true,
            fail_remove: false,
        }
    }

    pub(crate) fn failing_remove() -> Self {
        Self {
            inner: MemoryCacheStore::new(100, Duration::from_secs(600)),
            fail_get: false,
            fail_remove: true,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl CacheStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_get {
            return Err(AppError::CacheError {
                message: format!("GET {} refused", key),
            });
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        if self.fail_remove {
            return Err(AppError::CacheError {
                message: format!("DEL {} refused", key),
            });
        }
        self.inner.remove(key).await
    }
}
