//! Redis hash-backed cache store.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use async_trait::async_trait;

use fibdispatch_core::{CacheValue, JobIndex};

use super::{CacheSnapshot, CacheStore};
use crate::error::StoreError;

/// Redis cache: one hash (`HSET`/`HGETALL`) named after the result set.
///
/// Created disconnected; [`connect`](Self::connect) is driven by the
/// connection lifecycle so the readiness gate reflects the real state.
pub struct RedisCacheStore {
    client: redis::Client,
    hash_key: String,
    conn: RwLock<Option<ConnectionManager>>,
}

impl core::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("hash_key", &self.hash_key)
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisCacheStore {
    pub fn new(redis_url: impl AsRef<str>, hash_key: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| StoreError::Cache(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            hash_key: hash_key.into(),
            conn: RwLock::new(None),
        })
    }

    /// Open the connection. Safe to call again after a failure.
    pub async fn connect(&self) -> Result<(), StoreError> {
        let manager = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| StoreError::Cache(format!("failed to connect to redis: {e}")))?;
        *self.conn.write().await = Some(manager);
        info!(hash_key = %self.hash_key, "redis cache connected");
        Ok(())
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or(StoreError::NotConnected("redis cache"))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    #[instrument(skip_all, fields(index = %index), err)]
    async fn set(&self, index: JobIndex, value: CacheValue) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let encoded = value.encode();
        debug!(hash_key = %self.hash_key, field = %index, value = %encoded, "cache HSET");

        conn.hset::<_, _, _, ()>(&self.hash_key, index.as_field(), encoded)
            .await
            .map_err(|e| StoreError::Cache(format!("HSET failed: {e}")))
    }

    #[instrument(skip_all, err)]
    async fn snapshot(&self) -> Result<CacheSnapshot, StoreError> {
        let mut conn = self.connection().await?;
        conn.hgetall::<_, CacheSnapshot>(&self.hash_key)
            .await
            .map_err(|e| StoreError::Cache(format!("HGETALL failed: {e}")))
    }

    async fn close(&self) {
        if self.conn.write().await.take().is_some() {
            info!("redis cache connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn operations_fail_before_connect() {
        let cache = RedisCacheStore::new("redis://127.0.0.1:1", "fibonacci_results").unwrap();
        let err = cache.snapshot().await.unwrap_err();
        assert!(matches!(err, StoreError::NotConnected(_)));
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(RedisCacheStore::new("not a url", "k").is_err());
    }
}
