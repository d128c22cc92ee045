//! Key/value cache backends.
//!
//! `CacheStore` is the seam between the dashboard and its cache. Production
//! uses Redis; tests and local runs can use the in-process `MemoryCache`.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{OnceCell, RwLock};

use crate::error::{AppError, Result};

/// Upper bound for any single Redis round trip, connecting included.
pub const REDIS_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal string cache with expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Check connectivity.
    async fn ping(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Delete the given keys. Returns how many existed and were removed.
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Redis-backed cache with a lazily created, shared connection.
pub struct RedisCache {
    url: Option<String>,
    conn: OnceCell<ConnectionManager>,
}

impl RedisCache {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            conn: OnceCell::new(),
        }
    }

    /// Get the shared connection, connecting on first use. A failed attempt
    /// leaves the cell empty so the next call retries.
    async fn connection(&self) -> Result<ConnectionManager> {
        let url = self.url.as_deref().ok_or_else(|| {
            AppError::Config("REDIS_URL environment variable is not set".to_string())
        })?;

        let conn = self
            .conn
            .get_or_try_init(|| async {
                let client = redis::Client::open(url)?;
                let manager = tokio::time::timeout(REDIS_TIMEOUT, ConnectionManager::new(client))
                    .await
                    .map_err(|_| AppError::Cache("Timed out connecting to Redis".to_string()))??;
                tracing::info!("Connected to Redis");
                Ok::<_, AppError>(manager)
            })
            .await?;

        Ok(conn.clone())
    }

    async fn bounded<T, F>(fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(REDIS_TIMEOUT, fut)
            .await
            .map_err(|_| AppError::Cache("Redis operation timed out".to_string()))?
            .map_err(AppError::from)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = Self::bounded(redis::cmd("PING").query_async(&mut conn)).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        Self::bounded(conn.get(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        Self::bounded(conn.set_ex::<_, _, ()>(key, value, seconds)).await
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        Self::bounded(conn.del::<_, u64>(keys.to_vec())).await
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache with the same semantics as the Redis backend.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|e| e.expires_at > now)
            .count();
        Ok(removed as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_set_get() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_delete_counts_existing_keys() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        for key in ["dashboard:a:u1", "dashboard:b:u1", "dashboard:a:u2"] {
            cache.set(key, "x".to_string(), ttl).await.unwrap();
        }
        let keys = vec![
            "dashboard:a:u1".to_string(),
            "dashboard:b:u1".to_string(),
            "dashboard:c:u1".to_string(),
        ];
        assert_eq!(cache.delete(&keys).await.unwrap(), 2);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("dashboard:a:u2").await.unwrap().is_some());
        assert_eq!(cache.delete(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_redis_without_url_is_config_error() {
        let cache = RedisCache::new(None);
        let err = cache.ping().await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("REDIS_URL"));
    }

    #[tokio::test]
    async fn test_redis_invalid_url_fails() {
        let cache = RedisCache::new(Some("not-a-redis-url".to_string()));
        assert!(cache.get("k").await.is_err());
    }
}
