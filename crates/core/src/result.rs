//! Shapes held by the durable and cache views of job results.

use serde::{Deserialize, Serialize};

use crate::index::JobIndex;

/// Cache value written at submission time, before the result is known.
pub const PLACEHOLDER: &str = "Nothing yet!";

/// One row of the durable result table.
///
/// Serialized with the table's column names so `GET /results/all` returns
/// `{number, result}` objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub number: i32,
    pub result: i64,
}

impl ResultRow {
    /// Row inserted on first submission.
    pub fn pending(index: JobIndex) -> Self {
        Self {
            number: index.get(),
            result: 0,
        }
    }
}

/// Value of one cache-hash field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheValue {
    Placeholder,
    Computed(i64),
}

impl CacheValue {
    /// String form stored in the cache hash.
    pub fn encode(self) -> String {
        match self {
            Self::Placeholder => PLACEHOLDER.to_string(),
            Self::Computed(v) => v.to_string(),
        }
    }
}
