//! `fibdispatch-core` — job domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the validated job index, the result recurrence, and the shapes stored in
//! the durable and cache views.

pub mod compute;
pub mod error;
pub mod index;
pub mod result;

pub use compute::{fib, ComputeError};
pub use error::{DomainError, DomainResult};
pub use index::{JobIndex, MAX_INDEX};
pub use result::{CacheValue, ResultRow, PLACEHOLDER};
