//! Durable result store boundary (source of truth).
//!
//! One row per index. A row is created with value 0 on first submission and
//! updated in place once the worker has computed it; rows are never deleted.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use fibdispatch_core::{JobIndex, ResultRow};

use crate::error::StoreError;

pub use in_memory::InMemoryResultStore;
pub use postgres::{PostgresResultStore, RESULTS_TABLE};

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Create the result table if it does not exist.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Insert `(index, 0)` unless a row for `index` already exists.
    ///
    /// Returns whether a row was inserted. Never resets a computed value.
    async fn insert_pending(&self, index: JobIndex) -> Result<bool, StoreError>;

    /// Set the computed value of an existing row.
    ///
    /// Returns the number of rows updated (0 if no row exists for `index`).
    async fn record_result(&self, index: JobIndex, value: i64) -> Result<u64, StoreError>;

    /// Every row, ordered by index ascending.
    async fn list_all(&self) -> Result<Vec<ResultRow>, StoreError>;

    /// Release the underlying connections.
    async fn close(&self) {}
}

#[async_trait]
impl<S> ResultStore for Arc<S>
where
    S: ResultStore + ?Sized,
{
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        (**self).ensure_schema().await
    }

    async fn insert_pending(&self, index: JobIndex) -> Result<bool, StoreError> {
        (**self).insert_pending(index).await
    }

    async fn record_result(&self, index: JobIndex, value: i64) -> Result<u64, StoreError> {
        (**self).record_result(index, value).await
    }

    async fn list_all(&self) -> Result<Vec<ResultRow>, StoreError> {
        (**self).list_all().await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
