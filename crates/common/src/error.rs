//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Forbidden`] → 403
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::PayloadTooLarge`] → 413
/// - [`ServiceError::Unprocessable`] → 422
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller-correctable input: failed validation, malformed ciphertext.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A missing, forged or expired access grant.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The referenced document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body exceeds the accepted size.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Data failed integrity verification. The message must not reveal
    /// whether the cause was corruption or tampering.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// Encryption failed due to a crypto-layer error.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Forbidden(_) => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::PayloadTooLarge(_) => 413,
            ServiceError::Unprocessable(_) => 422,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for the error response body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::PayloadTooLarge(_) => "payload_too_large",
            ServiceError::Unprocessable(_) => "unprocessable",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// The caller-safe message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::BadRequest(m)
            | ServiceError::Forbidden(m)
            | ServiceError::NotFound(m)
            | ServiceError::PayloadTooLarge(m)
            | ServiceError::Unprocessable(m)
            | ServiceError::EncryptionFailure(m)
            | ServiceError::Internal(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(ServiceError::NotFound("x".into()).http_status(), 404);
        assert_eq!(ServiceError::PayloadTooLarge("x".into()).http_status(), 413);
        assert_eq!(ServiceError::Unprocessable("x".into()).http_status(), 422);
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).http_status(),
            500
        );
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("file extension \".exe\" is not allowed".into());
        assert!(e.to_string().contains("is not allowed"));
        assert_eq!(e.message(), "file extension \".exe\" is not allowed");
        assert_eq!(e.code(), "bad_request");
    }
}
