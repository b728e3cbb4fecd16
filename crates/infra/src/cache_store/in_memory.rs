use std::sync::RwLock;

use async_trait::async_trait;

use fibdispatch_core::{CacheValue, JobIndex};

use super::{CacheSnapshot, CacheStore};
use crate::error::StoreError;

/// In-memory cache hash for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    fields: RwLock<CacheSnapshot>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: JobIndex) -> Option<String> {
        self.fields.read().ok()?.get(&index.as_field()).cloned()
    }
}

fn poisoned() -> StoreError {
    StoreError::Cache("cache lock poisoned".to_string())
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn set(&self, index: JobIndex, value: CacheValue) -> Result<(), StoreError> {
        self.fields
            .write()
            .map_err(|_| poisoned())?
            .insert(index.as_field(), value.encode());
        Ok(())
    }

    async fn snapshot(&self) -> Result<CacheSnapshot, StoreError> {
        Ok(self.fields.read().map_err(|_| poisoned())?.clone())
    }
}
