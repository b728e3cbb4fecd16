//! Readiness gate: per-connection state read before serving dependent requests.
//!
//! Each external connection owns one [`ConnectionState`]. Only the
//! connection lifecycle handler writes it; request handlers get a
//! [`ReadinessGate`] injected and only read it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Handshake not completed yet (initial state, or still retrying).
    Connecting,
    /// Handshake succeeded.
    Ready,
    /// Reconnect policy gave up.
    Failed,
}

impl ConnectionStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Ready,
            2 => Self::Failed,
            _ => Self::Connecting,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Ready => 1,
            Self::Failed => 2,
        }
    }
}

/// Atomic state of one named connection.
#[derive(Debug)]
pub struct ConnectionState {
    name: &'static str,
    status: AtomicU8,
}

impl ConnectionState {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            status: AtomicU8::new(ConnectionStatus::Connecting.as_u8()),
        }
    }

    /// A state that starts out ready (in-memory backends).
    pub fn ready(name: &'static str) -> Self {
        let state = Self::new(name);
        state.mark_ready();
        state
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.status() == ConnectionStatus::Ready
    }

    pub fn mark_ready(&self) {
        self.status
            .store(ConnectionStatus::Ready.as_u8(), Ordering::Release);
    }

    /// The connection was lost and is being re-established.
    pub fn mark_connecting(&self) {
        self.status
            .store(ConnectionStatus::Connecting.as_u8(), Ordering::Release);
    }

    pub fn mark_failed(&self) {
        self.status
            .store(ConnectionStatus::Failed.as_u8(), Ordering::Release);
    }
}

/// A required connection is not established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{connection} not ready yet")]
pub struct NotReady {
    pub connection: &'static str,
}

/// The set of connections the ingress depends on.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    cache: Arc<ConnectionState>,
    bus: Arc<ConnectionState>,
}

impl ReadinessGate {
    pub fn new(cache: Arc<ConnectionState>, bus: Arc<ConnectionState>) -> Self {
        Self { cache, bus }
    }

    /// Both connections already ready (in-memory wiring).
    pub fn always_ready() -> Self {
        Self::new(
            Arc::new(ConnectionState::ready("cache")),
            Arc::new(ConnectionState::ready("bus")),
        )
    }

    pub fn cache(&self) -> &Arc<ConnectionState> {
        &self.cache
    }

    pub fn bus(&self) -> &Arc<ConnectionState> {
        &self.bus
    }

    pub fn require_cache(&self) -> Result<(), NotReady> {
        require(&self.cache)
    }

    /// Gate for submissions, which write the cache and publish on the bus.
    pub fn require_submit(&self) -> Result<(), NotReady> {
        require(&self.bus)?;
        require(&self.cache)
    }
}

fn require(state: &ConnectionState) -> Result<(), NotReady> {
    if state.is_ready() {
        Ok(())
    } else {
        Err(NotReady {
            connection: state.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_connecting_and_transitions() {
        let state = ConnectionState::new("bus");
        assert_eq!(state.status(), ConnectionStatus::Connecting);
        assert!(!state.is_ready());

        state.mark_ready();
        assert!(state.is_ready());

        state.mark_connecting();
        assert_eq!(state.status(), ConnectionStatus::Connecting);

        state.mark_failed();
        assert_eq!(state.status(), ConnectionStatus::Failed);
    }

    #[test]
    fn submit_requires_bus_and_cache() {
        let cache = Arc::new(ConnectionState::new("cache"));
        let bus = Arc::new(ConnectionState::new("bus"));
        let gate = ReadinessGate::new(cache.clone(), bus.clone());

        assert_eq!(gate.require_submit(), Err(NotReady { connection: "bus" }));
        bus.mark_ready();
        assert_eq!(gate.require_submit(), Err(NotReady { connection: "cache" }));
        assert_eq!(gate.require_cache(), Err(NotReady { connection: "cache" }));

        cache.mark_ready();
        assert!(gate.require_submit().is_ok());
        assert!(gate.require_cache().is_ok());
    }
}
