//! Job worker: bus message → compute → durable row → cache field.
//!
//! Each message is handled on its own; a failure is logged and the message
//! dropped. There is no retry, dead-letter queue, or acknowledgement.
//! Duplicate deliveries only cost a recomputation, since the value for an
//! index never changes.
//!
//! Writes are sequenced durable-first: once the durable update succeeds
//! the result is safe, and a cache failure only leaves the fast view stale.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use fibdispatch_core::{CacheValue, ComputeError, DomainError, JobIndex, fib};
use fibdispatch_events::{JobBus, JobMessage, Subscription};

use crate::cache_store::CacheStore;
use crate::error::StoreError;
use crate::readiness::ConnectionState;
use crate::reconnect::{ConnectError, ReconnectPolicy, establish};
use crate::result_store::ResultStore;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("bad payload {payload:?}: {source}")]
    Payload {
        payload: String,
        #[source]
        source: DomainError,
    },

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("durable write failed: {0}")]
    Durable(#[source] StoreError),

    #[error("cache write failed: {0}")]
    Cache(#[source] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOutcome {
    pub index: JobIndex,
    pub value: i64,
    /// Whether a durable row existed to receive the value.
    pub durable_updated: bool,
    pub elapsed: Duration,
}

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl WorkerStats {
    /// Add the counters of another run (e.g. a previous subscription).
    pub fn absorb(&mut self, other: WorkerStats) {
        self.received += other.received;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

#[derive(Clone)]
pub struct JobWorker {
    results: Arc<dyn ResultStore>,
    cache: Arc<dyn CacheStore>,
}

impl core::fmt::Debug for JobWorker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobWorker").finish_non_exhaustive()
    }
}

impl JobWorker {
    pub fn new(results: Arc<dyn ResultStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { results, cache }
    }

    /// Process one bus message end to end.
    pub async fn process(&self, message: &JobMessage) -> Result<JobOutcome, WorkerError> {
        let index = message.index().map_err(|source| WorkerError::Payload {
            payload: message.payload().to_string(),
            source,
        })?;
        info!(index = %index, "job received");

        let started = Instant::now();
        let value = fib(index)?;
        let elapsed = started.elapsed();

        let updated = self
            .results
            .record_result(index, value)
            .await
            .map_err(WorkerError::Durable)?;
        if updated == 0 {
            warn!(index = %index, "no durable row for job; result kept in cache only");
        }

        self.cache
            .set(index, CacheValue::Computed(value))
            .await
            .map_err(WorkerError::Cache)?;

        info!(
            index = %index,
            value,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "job completed"
        );

        Ok(JobOutcome {
            index,
            value,
            durable_updated: updated > 0,
            elapsed,
        })
    }

    /// Consume `subscription` on a background task until shutdown or the
    /// bus goes away.
    pub fn spawn(self, name: &'static str, subscription: Subscription<JobMessage>) -> JobWorkerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(worker_loop(name, self, subscription, shutdown_rx));

        JobWorkerHandle {
            shutdown: Some(shutdown_tx),
            join,
            stopped: None,
        }
    }
}

/// Handle to stop and join a spawned worker.
#[derive(Debug)]
pub struct JobWorkerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<WorkerStats>,
    stopped: Option<WorkerStats>,
}

impl JobWorkerHandle {
    /// Stop consuming, close the subscription, and wait for the loop to exit.
    ///
    /// A message being processed when this is called is finished first;
    /// messages still buffered in the subscription are discarded.
    pub async fn shutdown(mut self) -> WorkerStats {
        if let Some(stats) = self.stopped {
            return stats;
        }
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        join_stats(&mut self.join).await
    }

    /// Wait for the loop to exit on its own, which happens when the
    /// subscription's transport goes away.
    ///
    /// Cancel-safe; calling it again after it returned yields the same stats.
    pub async fn stopped(&mut self) -> WorkerStats {
        if let Some(stats) = self.stopped {
            return stats;
        }
        let stats = join_stats(&mut self.join).await;
        self.stopped = Some(stats);
        stats
    }
}

async fn join_stats(join: &mut JoinHandle<WorkerStats>) -> WorkerStats {
    match join.await {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "job worker task failed");
            WorkerStats::default()
        }
    }
}

/// Keep `worker` subscribed to `bus` until `shutdown` resolves.
///
/// Subscribing goes through [`establish`], so `state` tracks the
/// subscriber connection. When a subscription ends on its own (the
/// transport dropped) the worker resubscribes under the same policy.
/// Jobs published while no subscription is live are lost.
///
/// Returns the accumulated stats on shutdown, or the connect error once
/// the policy gives up.
pub async fn run_subscribed<B, F>(
    worker: JobWorker,
    name: &'static str,
    bus: &B,
    state: &ConnectionState,
    policy: &ReconnectPolicy,
    shutdown: F,
) -> Result<WorkerStats, ConnectError>
where
    B: JobBus<JobMessage> + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut totals = WorkerStats::default();

    loop {
        let subscription = tokio::select! {
            biased;
            _ = &mut shutdown => return Ok(totals),
            subscription = establish(state, policy, || bus.subscribe()) => subscription?,
        };

        let mut handle = worker.clone().spawn(name, subscription);
        let lost = tokio::select! {
            biased;
            _ = &mut shutdown => false,
            _ = handle.stopped() => true,
        };
        totals.absorb(handle.shutdown().await);

        if !lost {
            return Ok(totals);
        }
        state.mark_connecting();
        warn!(worker = name, "job subscription lost; resubscribing");
    }
}

async fn worker_loop(
    name: &'static str,
    worker: JobWorker,
    mut subscription: Subscription<JobMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    info!(worker = name, "listening for jobs");

    loop {
        let message = tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            message = subscription.recv() => message,
        };

        let Some(message) = message else {
            debug!(worker = name, "job bus closed");
            break;
        };

        stats.received += 1;
        match worker.process(&message).await {
            Ok(_) => stats.succeeded += 1,
            Err(err) => {
                stats.failed += 1;
                error!(worker = name, payload = message.payload(), error = %err, "job failed; message dropped");
            }
        }
    }

    subscription.close();
    info!(
        worker = name,
        received = stats.received,
        succeeded = stats.succeeded,
        failed = stats.failed,
        "job worker stopped"
    );
    stats
}
