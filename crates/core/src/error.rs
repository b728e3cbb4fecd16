//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic validation failures. Infrastructure
/// concerns (stores, bus, readiness) belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The submitted index is not an integer, or is negative.
    #[error("invalid input: {0}")]
    InvalidInput(InvalidInput),

    /// The submitted index exceeds [`crate::MAX_INDEX`].
    #[error("index too high: {index} > {max}")]
    OutOfRange { index: i64, max: i32 },
}

/// Reason an index was rejected as invalid input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("non-numeric")]
    NonNumeric,

    #[error("must be non-negative")]
    Negative,
}

impl DomainError {
    pub fn non_numeric() -> Self {
        Self::InvalidInput(InvalidInput::NonNumeric)
    }

    pub fn negative() -> Self {
        Self::InvalidInput(InvalidInput::Negative)
    }

    pub fn out_of_range(index: i64) -> Self {
        Self::OutOfRange {
            index,
            max: crate::MAX_INDEX,
        }
    }
}
