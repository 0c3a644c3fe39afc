//! Request and response bodies of the HTTP API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field endpoints
// ---------------------------------------------------------------------------

/// Body of `POST /fields/encrypt` and `POST /fields/decrypt`, and of their
/// responses.
///
/// Keys are caller-chosen field names; `null` values stay `null` and blank
/// strings pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValues {
    pub values: BTreeMap<String, Option<String>>,
}

// ---------------------------------------------------------------------------
// Document endpoints
// ---------------------------------------------------------------------------

/// Response body for `POST /files/{container}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFileResponse {
    /// `container/name` address to persist in the caller's own records.
    pub path: String,
}

/// Response body for `POST /files/{container}/{name}/access`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessUrlResponse {
    /// Signed download URL.
    pub url: String,
    /// RFC 3339 instant after which the URL is rejected.
    pub expires_at: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: String,
    /// Document backend in use (`"filesystem"` or `"s3"`).
    pub backend: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_values_keep_nulls() {
        let v: FieldValues =
            serde_json::from_value(json!({"values": {"diagnosis": "flu", "notes": null}}))
                .unwrap();
        assert_eq!(v.values["diagnosis"].as_deref(), Some("flu"));
        assert_eq!(v.values["notes"], None);
        let back = serde_json::to_value(&v).unwrap();
        assert!(back["values"]["notes"].is_null());
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("not_found", "unable to process the requested document");
        assert_eq!(e.code, "not_found");
        assert!(e.message.contains("unable to process"));
    }
}
