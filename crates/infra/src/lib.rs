//! Infrastructure layer: stores, bus adapters, connection lifecycle, config,
//! and the ingress/worker services built on them.

pub mod cache_store;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod ingress;
pub mod readiness;
pub mod reconnect;
pub mod result_store;
pub mod signal;
pub mod workers;


pub use error::StoreError;
pub use ingress::{IngressError, IngressService, Submitted};
pub use readiness::{ConnectionState, ConnectionStatus, NotReady, ReadinessGate};
pub use reconnect::{BackoffStrategy, ConnectError, ReconnectPolicy, establish};
