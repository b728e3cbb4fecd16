use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use fibdispatch_core::{JobIndex, ResultRow};

use super::ResultStore;
use crate::error::StoreError;

/// In-memory result table for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    rows: RwLock<BTreeMap<i32, i64>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for `index`, if a row exists.
    pub fn get(&self, index: JobIndex) -> Option<i64> {
        self.rows.read().ok()?.get(&index.get()).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Database("result table lock poisoned".to_string())
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_pending(&self, index: JobIndex) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&index.get()) {
            return Ok(false);
        }
        rows.insert(index.get(), 0);
        Ok(true)
    }

    async fn record_result(&self, index: JobIndex, value: i64) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        match rows.get_mut(&index.get()) {
            Some(v) => {
                *v = value;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_all(&self) -> Result<Vec<ResultRow>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .iter()
            .map(|(&number, &result)| ResultRow { number, result })
            .collect())
    }
}
