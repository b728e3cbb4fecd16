//! Job submission and result queries (the ingress side of the pipeline).
//!
//! ## Submission Flow
//!
//! ```text
//! raw index
//!   ↓
//! 1. Validate (integer, 0..=MAX_INDEX)        → InvalidInput / OutOfRange
//!   ↓
//! 2. Readiness gate (bus + cache connected)   → NotReady
//!   ↓
//! 3. Durable upsert (index, 0), DO NOTHING on conflict
//!   ↓
//! 4. Cache placeholder
//!   ↓
//! 5. Publish index on the job bus (fire-and-forget)
//! ```
//!
//! Steps 1-2 run before any side effect. Steps 3-5 are independent writes
//! with no shared transaction: a failure part-way leaves the earlier writes
//! applied. The durable row goes first so the worker's update always has a
//! row to land on.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info};

use fibdispatch_core::{CacheValue, DomainError, JobIndex, ResultRow};
use fibdispatch_events::{BusError, JobBus, JobMessage};

use crate::cache_store::{CacheSnapshot, CacheStore};
use crate::error::StoreError;
use crate::readiness::{NotReady, ReadinessGate};
use crate::result_store::ResultStore;

#[derive(Debug, Error)]
pub enum IngressError {
    /// Submission rejected by validation (no side effects happened).
    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// A required connection is not established (no side effects happened).
    #[error(transparent)]
    NotReady(#[from] NotReady),

    /// A store read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Publishing the job failed after the stores were written.
    #[error(transparent)]
    Publish(#[from] BusError),
}

/// What a successful submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submitted {
    pub index: JobIndex,
    /// Whether a new durable row was created (false on resubmission).
    pub created: bool,
    /// Subscribers that received the job; 0 means it was lost.
    pub receivers: usize,
}

/// Ingress service: validates submissions, writes placeholders, publishes
/// jobs, and serves both result views.
#[derive(Clone)]
pub struct IngressService {
    results: Arc<dyn ResultStore>,
    cache: Arc<dyn CacheStore>,
    bus: Arc<dyn JobBus<JobMessage>>,
    gate: ReadinessGate,
}

impl core::fmt::Debug for IngressService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IngressService")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl IngressService {
    pub fn new(
        results: Arc<dyn ResultStore>,
        cache: Arc<dyn CacheStore>,
        bus: Arc<dyn JobBus<JobMessage>>,
        gate: ReadinessGate,
    ) -> Self {
        Self {
            results,
            cache,
            bus,
            gate,
        }
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    /// Submit the raw `index` field of a request.
    ///
    /// Success only acknowledges the submission; the job may never complete.
    pub async fn submit(&self, raw: &JsonValue) -> Result<Submitted, IngressError> {
        let index = JobIndex::from_json(raw)?;
        self.gate.require_submit()?;

        let created = self.results.insert_pending(index).await?;
        self.cache.set(index, CacheValue::Placeholder).await?;
        let receivers = self.bus.publish(JobMessage::for_index(index)).await?;

        if receivers == 0 {
            debug!(index = %index, "job published with no subscribers; it will not be processed");
        }
        info!(index = %index, created, receivers, "job submitted");

        Ok(Submitted {
            index,
            created,
            receivers,
        })
    }

    /// Every durable row, ordered by index.
    pub async fn list_all(&self) -> Result<Vec<ResultRow>, IngressError> {
        Ok(self.results.list_all().await?)
    }

    /// The full cache view. Requires the cache connection.
    pub async fn list_current(&self) -> Result<CacheSnapshot, IngressError> {
        self.gate.require_cache()?;
        Ok(self.cache.snapshot().await?)
    }
}
