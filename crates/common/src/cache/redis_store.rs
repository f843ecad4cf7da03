//! Redis cache backend, for deployments running several gateway instances.

use super::CacheStore;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, Client};
use std::time::Duration;
use tracing::info;

/// Shared store. Reads use `GETEX` so a hit renews the TTL.
pub struct RedisCacheStore {
    connection: MultiplexedConnection,
    key_prefix: String,
    ttl_secs: u64,
}

impl RedisCacheStore {
    /// Connect to Redis
    pub async fn connect(url: &str, key_prefix: &str, sliding_ttl: Duration) -> Result<Self> {
        let client = Client::open(url).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        info!(prefix = key_prefix, "Connected to Redis cache");

        Ok(Self {
            connection,
            key_prefix: key_prefix.to_string(),
            ttl_secs: sliding_ttl.as_secs().max(1),
        })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        redis::cmd("GETEX")
            .arg(&full_key)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to get key '{}': {}", full_key, e),
            })
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", full_key, e),
            })
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        let deleted = redis::cmd("DEL")
            .arg(&full_key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to delete key '{}': {}", full_key, e),
            })?;

        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }
}
