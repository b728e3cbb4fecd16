//! Cache store boundary (ephemeral, fast-read view of results).
//!
//! A single hash keyed by stringified index. Values are either the
//! placeholder or the stringified result. Fields are only ever overwritten,
//! never deleted or expired. Each field write is atomic on its own; there
//! are no cross-field transactions.

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use fibdispatch_core::{CacheValue, JobIndex};

use crate::error::StoreError;

pub use in_memory::InMemoryCacheStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisCacheStore;

/// Full view of the cache hash: index field -> stored string.
pub type CacheSnapshot = HashMap<String, String>;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Overwrite the field for `index`.
    async fn set(&self, index: JobIndex, value: CacheValue) -> Result<(), StoreError>;

    /// Every field of the hash.
    async fn snapshot(&self) -> Result<CacheSnapshot, StoreError>;

    /// Release the underlying connection.
    async fn close(&self) {}
}

#[async_trait]
impl<S> CacheStore for Arc<S>
where
    S: CacheStore + ?Sized,
{
    async fn set(&self, index: JobIndex, value: CacheValue) -> Result<(), StoreError> {
        (**self).set(index, value).await
    }

    async fn snapshot(&self) -> Result<CacheSnapshot, StoreError> {
        (**self).snapshot().await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
