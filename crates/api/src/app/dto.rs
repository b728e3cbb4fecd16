use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /calculate/results`.
///
/// `index` is kept raw so validation can tell "non-numeric" apart from the
/// range errors; a missing field is treated as non-numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculateRequest {
    pub index: JsonValue,
}

impl CalculateRequest {
    /// Read the request out of a parsed body. Only a JSON object has fields.
    pub fn from_body(body: JsonValue) -> Option<Self> {
        match body {
            JsonValue::Object(mut fields) => Some(Self {
                index: fields.remove("index").unwrap_or(JsonValue::Null),
            }),
            _ => None,
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingResponse {
    pub working: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_objects_carry_an_index() {
        assert_eq!(
            CalculateRequest::from_body(json!({ "index": "7" })),
            Some(CalculateRequest { index: json!("7") })
        );
        assert_eq!(
            CalculateRequest::from_body(json!({})),
            Some(CalculateRequest { index: JsonValue::Null })
        );
        assert_eq!(CalculateRequest::from_body(json!([1])), None);
        assert_eq!(CalculateRequest::from_body(json!("abc")), None);
        assert_eq!(CalculateRequest::from_body(json!(5)), None);
    }
}
