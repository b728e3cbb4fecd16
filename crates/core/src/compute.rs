//! The job's deterministic computation.

use thiserror::Error;

use crate::index::JobIndex;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComputeError {
    /// The result does not fit a signed 64-bit accumulator.
    #[error("result for index {0} overflows i64")]
    Overflow(i32),
}

/// Iterative O(n) Fibonacci.
///
/// Indices below 2 (including any negative index that slipped past the
/// publisher) yield the index itself.
pub fn fib(index: JobIndex) -> Result<i64, ComputeError> {
    let n = index.get();
    if n < 2 {
        return Ok(i64::from(n));
    }

    let (mut a, mut b) = (0i64, 1i64);
    for _ in 2..=n {
        let next = a.checked_add(b).ok_or(ComputeError::Overflow(n))?;
        a = b;
        b = next;
    }
    Ok(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(n: i32) -> Result<i64, ComputeError> {
        fib(JobIndex::from_payload(&n.to_string()).unwrap())
    }

    #[test]
    fn known_values() {
        assert_eq!(at(0), Ok(0));
        assert_eq!(at(1), Ok(1));
        assert_eq!(at(2), Ok(1));
        assert_eq!(at(5), Ok(5));
        assert_eq!(at(10), Ok(55));
        assert_eq!(at(40), Ok(102_334_155));
    }

    #[test]
    fn largest_representable_and_overflow() {
        assert_eq!(at(92), Ok(7_540_113_804_746_346_429));
        assert_eq!(at(93), Err(ComputeError::Overflow(93)));
    }

    #[test]
    fn negative_payload_yields_itself() {
        assert_eq!(at(-3), Ok(-3));
    }

    proptest! {
        /// fib(n) = fib(n-1) + fib(n-2) across the accepted domain.
        #[test]
        fn recurrence_holds(n in 2i32..=40) {
            prop_assert_eq!(at(n).unwrap(), at(n - 1).unwrap() + at(n - 2).unwrap());
        }
    }
}
