//! In-process cache backend built on `moka`.

use super::CacheStore;
use crate::errors::Result;
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use std::sync::Arc;
use std::time::Duration;

/// Process-local store. Entries idle for longer than the sliding TTL expire.
pub struct MemoryCacheStore {
    inner: MokaCache<String, Arc<str>>,
}

impl MemoryCacheStore {
    pub fn new(max_capacity: u64, sliding_ttl: Duration) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(sliding_ttl)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.get(key).await.map(|value| value.to_string()))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.inner.insert(key.to_string(), Arc::from(value)).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.inner.remove(key).await.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryCacheStore::new(10, Duration::from_secs(60));
        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(store.remove("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_extend_lifetime() {
        let store = MemoryCacheStore::new(10, Duration::from_millis(400));
        store.set("k", "v".to_string()).await.unwrap();

        // Total age exceeds the TTL, but no gap between reads does.
        sleep(Duration::from_millis(250)).await;
        assert!(store.get("k").await.unwrap().is_some());
        sleep(Duration::from_millis(250)).await;
        assert!(store.get("k").await.unwrap().is_some());

        sleep(Duration::from_millis(700)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }
}
