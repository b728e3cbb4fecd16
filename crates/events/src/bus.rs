//! Job publishing/subscription abstraction (mechanics only).
//!
//! The bus is **fire-and-forget**:
//!
//! - A message reaches only the subscribers connected at publish time
//! - No persistence, no replay, no acknowledgement
//! - At-most-once per subscriber; a message published with nobody listening is lost
//!
//! Consumers must be idempotent: the same index may be announced more than
//! once (resubmission), and recomputing it yields the same value.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};

#[derive(Debug, Error)]
pub enum BusError {
    /// The bus connection has not been established yet.
    #[error("bus not connected")]
    NotConnected,

    /// The transport rejected the operation.
    #[error("bus transport error: {0}")]
    Transport(String),

    /// The bus has been shut down.
    #[error("bus closed")]
    Closed,
}

type CloseHook = Box<dyn FnOnce() + Send>;

/// A subscription to the job channel.
///
/// Each subscription receives a copy of every message published while it
/// is alive (broadcast semantics). Dropping or [`close`](Self::close)-ing it
/// unsubscribes.
pub struct Subscription<M> {
    receiver: mpsc::UnboundedReceiver<M>,
    on_close: Option<CloseHook>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: mpsc::UnboundedReceiver<M>) -> Self {
        Self {
            receiver,
            on_close: None,
        }
    }

    /// Attach transport teardown (e.g. stop a forwarding task) run on close.
    pub fn with_close_hook(
        receiver: mpsc::UnboundedReceiver<M>,
        on_close: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            on_close: Some(Box::new(on_close)),
        }
    }

    /// Wait for the next message. `None` once the bus side is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Unsubscribe. Messages already buffered are discarded.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.receiver.close();
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.receiver.is_closed())
            .field("has_close_hook", &self.on_close.is_some())
            .finish()
    }
}

/// Transport-agnostic job bus.
///
/// `publish` returns the number of subscribers that received the message.
/// Zero is not an error: the job is silently lost, matching pub/sub
/// semantics. Implementations must be safe to share across tasks.
#[async_trait]
pub trait JobBus<M>: Send + Sync
where
    M: Send + 'static,
{
    async fn publish(&self, message: M) -> Result<usize, BusError>;

    async fn subscribe(&self) -> Result<Subscription<M>, BusError>;
}

#[async_trait]
impl<M, B> JobBus<M> for Arc<B>
where
    M: Send + 'static,
    B: JobBus<M> + ?Sized,
{
    async fn publish(&self, message: M) -> Result<usize, BusError> {
        (**self).publish(message).await
    }

    async fn subscribe(&self) -> Result<Subscription<M>, BusError> {
        (**self).subscribe().await
    }
}
