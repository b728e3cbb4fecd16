//! Postgres-backed result store.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS fibonacci_results (number INT PRIMARY KEY, result BIGINT)
//! ```
//!
//! Each write is a single statement, so every write is atomic on its own.
//! Nothing here spans a transaction with the cache.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | PoolClosed | `NotConnected` |
//! | Database / Io / Tls / PoolTimedOut / other | `Database` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use fibdispatch_core::{JobIndex, ResultRow};

use super::ResultStore;
use crate::error::StoreError;

/// Name of the durable result table.
pub const RESULTS_TABLE: &str = "fibonacci_results";

#[derive(Debug, Clone)]
pub struct PostgresResultStore {
    pool: Arc<PgPool>,
}

impl PostgresResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Build a pool that connects on first use.
    ///
    /// Connection failures surface per query (as `StoreError::Database`)
    /// rather than at startup.
    pub fn connect_lazy(options: PgConnectOptions) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(options);
        Self::new(pool)
    }
}

#[async_trait]
impl ResultStore for PostgresResultStore {
    #[instrument(skip_all, err)]
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fibonacci_results (
                number INT PRIMARY KEY,
                result BIGINT
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;

        Ok(())
    }

    #[instrument(skip_all, fields(index = %index), err)]
    async fn insert_pending(&self, index: JobIndex) -> Result<bool, StoreError> {
        let done = sqlx::query(
            r#"
            INSERT INTO fibonacci_results (number, result)
            VALUES ($1, $2)
            ON CONFLICT (number) DO NOTHING
            "#,
        )
        .bind(index.get())
        .bind(0i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_pending", e))?;

        Ok(done.rows_affected() == 1)
    }

    #[instrument(skip_all, fields(index = %index, value = value), err)]
    async fn record_result(&self, index: JobIndex, value: i64) -> Result<u64, StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE fibonacci_results
            SET result = $1
            WHERE number = $2
            "#,
        )
        .bind(value)
        .bind(index.get())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_result", e))?;

        Ok(done.rows_affected())
    }

    #[instrument(skip_all, fields(row_count), err)]
    async fn list_all(&self) -> Result<Vec<ResultRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT number, result
            FROM fibonacci_results
            ORDER BY number ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_all", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let number: i32 = row
                .try_get("number")
                .map_err(|e| map_sqlx_error("list_all", e))?;
            let result: Option<i64> = row
                .try_get("result")
                .map_err(|e| map_sqlx_error("list_all", e))?;
            out.push(ResultRow {
                number,
                result: result.unwrap_or(0),
            });
        }

        Span::current().record("row_count", out.len());
        Ok(out)
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("postgres pool closed");
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolClosed => StoreError::NotConnected("postgres"),
        sqlx::Error::Database(db_err) => StoreError::Database(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_pool_maps_to_not_connected() {
        assert!(matches!(
            map_sqlx_error("list_all", sqlx::Error::PoolClosed),
            StoreError::NotConnected("postgres")
        ));
    }

    #[test]
    fn other_errors_map_to_database() {
        let err = map_sqlx_error("record_result", sqlx::Error::RowNotFound);
        match err {
            StoreError::Database(msg) => assert!(msg.contains("record_result")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
