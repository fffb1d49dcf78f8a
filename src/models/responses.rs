//! Response model
//!
//! A settled response as handed back to callers and stored in the cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response returned by the pipeline.
///
/// The same value (cloned) is delivered to every caller sharing a flight, and
/// to every cache hit on its fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, lower-cased names
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Decoded JSON body (`Null` when empty)
    #[serde(default)]
    pub body: Value,
}

impl ApiResponse {
    /// Creates a new ApiResponse with no headers
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Creates a 200 response
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Reads a string field from the top level of the body
    pub fn body_str(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_str() {
        let resp = ApiResponse::ok(json!({"csrfToken": "abc", "count": 3}));
        assert_eq!(resp.body_str("csrfToken"), Some("abc"));
        assert_eq!(resp.body_str("count"), None);
        assert_eq!(resp.body_str("missing"), None);
    }

    #[test]
    fn test_response_serialize() {
        let resp = ApiResponse::ok(json!({"users": []}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":200"));
        assert!(json.contains("users"));
    }
}
