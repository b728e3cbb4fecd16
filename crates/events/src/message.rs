use serde::{Deserialize, Serialize};

use fibdispatch_core::{DomainResult, JobIndex};

/// A job announcement as it travels on the bus.
///
/// The payload is the stringified index with no envelope or metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobMessage {
    payload: String,
}

impl JobMessage {
    pub fn for_index(index: JobIndex) -> Self {
        Self {
            payload: index.as_field(),
        }
    }

    /// Wrap a payload received from a transport.
    pub fn from_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> String {
        self.payload
    }

    /// Parse the payload back into an index (range is not re-validated).
    pub fn index(&self) -> DomainResult<JobIndex> {
        JobIndex::from_payload(&self.payload)
    }
}
