//! Job bus: pub/sub mechanics for handing jobs from ingress to worker.

pub mod bus;
pub mod in_memory_bus;
pub mod message;

pub use bus::{BusError, JobBus, Subscription};
pub use in_memory_bus::InMemoryJobBus;
pub use message::JobMessage;
