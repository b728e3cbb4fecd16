//! The job index: the sole identity of a job.

use core::num::IntErrorKind;
use core::str::FromStr;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{DomainError, DomainResult};

/// Highest index the ingress accepts.
pub const MAX_INDEX: i32 = 40;

/// Identity of a job and key of its result in both stores.
///
/// Values built through [`JobIndex::new`] or [`JobIndex::from_json`] are
/// guaranteed to lie in `0..=MAX_INDEX`. [`JobIndex::from_payload`] is the
/// worker-side constructor and trusts the publisher's validation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct JobIndex(i32);

impl JobIndex {
    /// Validate an already-parsed integer.
    pub fn new(index: i64) -> DomainResult<Self> {
        if index < 0 {
            return Err(DomainError::negative());
        }
        if index > i64::from(MAX_INDEX) {
            return Err(DomainError::out_of_range(index));
        }
        // Range checked above.
        Ok(Self(index as i32))
    }

    /// Parse and validate the raw `index` field of a submission.
    ///
    /// Accepts a JSON integer or a string holding an integer (surrounding
    /// whitespace ignored). Fractional numbers, booleans, null, arrays and
    /// objects are non-numeric.
    pub fn from_json(raw: &JsonValue) -> DomainResult<Self> {
        match raw {
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::new(i)
                } else if n.as_u64().is_some() {
                    Err(DomainError::out_of_range(i64::MAX))
                } else {
                    Err(DomainError::non_numeric())
                }
            }
            JsonValue::String(s) => s.parse(),
            _ => Err(DomainError::non_numeric()),
        }
    }

    /// Parse a bus payload without re-validating the range.
    pub fn from_payload(payload: &str) -> DomainResult<Self> {
        payload
            .trim()
            .parse::<i32>()
            .map(Self)
            .map_err(|_| DomainError::non_numeric())
    }

    pub fn get(self) -> i32 {
        self.0
    }

    /// Field name used for this index in the cache hash.
    pub fn as_field(self) -> String {
        self.0.to_string()
    }
}

impl FromStr for JobIndex {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(i) => Self::new(i),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Err(DomainError::out_of_range(i64::MAX)),
                IntErrorKind::NegOverflow => Err(DomainError::negative()),
                _ => Err(DomainError::non_numeric()),
            },
        }
    }
}

impl core::fmt::Display for JobIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidInput;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn accepts_bounds() {
        assert_eq!(JobIndex::new(0).unwrap().get(), 0);
        assert_eq!(JobIndex::new(40).unwrap().get(), 40);
    }

    #[test]
    fn rejects_negative_as_invalid_input() {
        assert_eq!(
            JobIndex::new(-1),
            Err(DomainError::InvalidInput(InvalidInput::Negative))
        );
    }

    #[test]
    fn serializes_as_plain_number() {
        let idx = JobIndex::from_json(&json!("7")).unwrap();
        assert_eq!(serde_json::to_value(idx).unwrap(), json!(7));
    }

    #[test]
    fn rejects_above_ceiling_as_out_of_range() {
        assert!(matches!(
            JobIndex::new(41),
            Err(DomainError::OutOfRange { index: 41, max: 40 })
        ));
    }

    #[test]
    fn json_strings_and_numbers_parse() {
        assert_eq!(JobIndex::from_json(&json!(10)).unwrap().get(), 10);
        assert_eq!(JobIndex::from_json(&json!("10")).unwrap().get(), 10);
        assert_eq!(JobIndex::from_json(&json!(" 7 ")).unwrap().get(), 7);
    }

    #[test]
    fn json_non_numeric_inputs_are_rejected() {
        for raw in [json!("abc"), json!(null), json!(true), json!(2.5), json!([1]), json!("")] {
            assert_eq!(
                JobIndex::from_json(&raw),
                Err(DomainError::non_numeric()),
                "input {raw}"
            );
        }
    }

    #[test]
    fn huge_values_are_classified_by_sign() {
        assert!(matches!(
            JobIndex::from_json(&json!("99999999999999999999999")),
            Err(DomainError::OutOfRange { .. })
        ));
        assert_eq!(
            JobIndex::from_json(&json!("-99999999999999999999999")),
            Err(DomainError::negative())
        );
        assert!(matches!(
            JobIndex::from_json(&json!(u64::MAX)),
            Err(DomainError::OutOfRange { .. })
        ));
    }

    #[test]
    fn payload_parsing_skips_range_validation() {
        assert_eq!(JobIndex::from_payload("55").unwrap().get(), 55);
        assert!(JobIndex::from_payload("nope").is_err());
    }

    proptest! {
        #[test]
        fn every_in_range_index_is_accepted(i in 0i64..=40) {
            let idx = JobIndex::new(i).unwrap();
            prop_assert_eq!(i64::from(idx.get()), i);
            prop_assert_eq!(idx.as_field(), i.to_string());
        }

        #[test]
        fn every_index_above_ceiling_is_out_of_range(i in 41i64..i64::MAX) {
            let is_out_of_range = matches!(JobIndex::new(i), Err(DomainError::OutOfRange { .. }));
            prop_assert!(is_out_of_range);
        }

        #[test]
        fn every_negative_index_is_invalid(i in i64::MIN..0) {
            prop_assert_eq!(JobIndex::new(i), Err(DomainError::negative()));
        }
    }
}
