//! In-memory job bus for tests/dev.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bus::{BusError, JobBus, Subscription};

/// In-memory pub/sub bus.
///
/// - Best-effort fan-out to live subscribers
/// - Dead subscribers are pruned on publish
/// - Publishing with no subscribers drops the message
#[derive(Debug)]
pub struct InMemoryJobBus<M> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<M>>>,
}

impl<M> InMemoryJobBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl<M> Default for InMemoryJobBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl<M> JobBus<M> for InMemoryJobBus<M>
where
    M: Clone + Send + 'static,
{
    async fn publish(&self, message: M) -> Result<usize, BusError> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| BusError::Transport("subscriber list poisoned".to_string()))?;

        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(subs.len())
    }

    async fn subscribe(&self) -> Result<Subscription<M>, BusError> {
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers
            .lock()
            .map_err(|_| BusError::Transport("subscriber list poisoned".to_string()))?
            .push(tx);

        Ok(Subscription::new(rx))
    }
}
