//! Redis pub/sub-backed job bus.
//!
//! Redis pub/sub is not durable: a message published while no worker is
//! subscribed is dropped, and Redis reports it only as a zero receiver
//! count. That matches the bus contract, so it is surfaced as `Ok(0)`.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, info, instrument, warn};

use async_trait::async_trait;

use fibdispatch_events::{BusError, JobBus, JobMessage, Subscription};

/// Redis pub/sub bus carrying stringified job indices.
///
/// Publishing uses a dedicated connection opened by [`connect`](Self::connect);
/// each subscription opens its own pub/sub connection.
pub struct RedisPubSubJobBus {
    client: redis::Client,
    channel: String,
    publisher: RwLock<Option<ConnectionManager>>,
}

impl core::fmt::Debug for RedisPubSubJobBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisPubSubJobBus")
            .field("channel", &self.channel)
            .finish()
    }
}

impl RedisPubSubJobBus {
    pub fn new(redis_url: impl AsRef<str>, channel: impl Into<String>) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| BusError::Transport(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            channel: channel.into(),
            publisher: RwLock::new(None),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Open the publisher connection.
    pub async fn connect(&self) -> Result<(), BusError> {
        let manager = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| BusError::Transport(format!("failed to connect publisher: {e}")))?;
        *self.publisher.write().await = Some(manager);
        info!(channel = %self.channel, "redis publisher connected");
        Ok(())
    }

    /// Drop the publisher connection. Open subscriptions are unaffected.
    pub async fn close(&self) {
        if self.publisher.write().await.take().is_some() {
            info!("redis publisher connection closed");
        }
    }
}

#[async_trait]
impl JobBus<JobMessage> for RedisPubSubJobBus {
    #[instrument(skip_all, fields(channel = %self.channel, payload = %message.payload()), err)]
    async fn publish(&self, message: JobMessage) -> Result<usize, BusError> {
        let mut conn = self
            .publisher
            .read()
            .await
            .clone()
            .ok_or(BusError::NotConnected)?;

        let receivers: i64 = conn
            .publish(&self.channel, message.into_payload())
            .await
            .map_err(|e| BusError::Transport(format!("PUBLISH failed: {e}")))?;

        Ok(usize::try_from(receivers).unwrap_or(0))
    }

    async fn subscribe(&self) -> Result<Subscription<JobMessage>, BusError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BusError::Transport(format!("failed to open pub/sub connection: {e}")))?;

        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| BusError::Transport(format!("SUBSCRIBE failed: {e}")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let channel = self.channel.clone();

        // Forward pub/sub messages until the subscription is closed or the connection drops.
        let forwarder = tokio::spawn(async move {
            let mut messages = std::pin::pin!(pubsub.into_on_message());
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "dropping undecodable bus payload");
                        continue;
                    }
                };

                if tx.send(JobMessage::from_payload(payload)).is_err() {
                    break;
                }
            }
            debug!(channel = %channel, "pub/sub forwarder stopped");
        });

        info!(channel = %self.channel, "subscribed to job channel");
        Ok(Subscription::with_close_hook(rx, move || forwarder.abort()))
    }
}
