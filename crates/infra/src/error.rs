//! Store error model shared by the durable and cache adapters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store's connection has not been established (or was closed).
    #[error("{0} not connected")]
    NotConnected(&'static str),

    /// Durable store failure.
    #[error("database error: {0}")]
    Database(String),

    /// Cache store failure.
    #[error("cache error: {0}")]
    Cache(String),
}
