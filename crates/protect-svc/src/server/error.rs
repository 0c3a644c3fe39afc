//! Mapping from library errors to HTTP responses.
//!
//! Not-found, integrity and access failures get fixed messages so that a
//! response never says whether a document exists, was tampered with, or why a
//! grant was refused. Validation messages are passed through verbatim.
//! Extractor rejections are rendered as [`ErrorResponse`] too, without the
//! framework's parser text.

use axum::{
    extract::rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, ServiceError};
use protect::{AccessError, CipherError, VaultError};
use tracing::{debug, error};

use super::middleware::MAX_REQUEST_BODY_BYTES;

const DOCUMENT_UNAVAILABLE: &str = "unable to process the requested document";
const VALUE_UNPROCESSABLE: &str = "unable to process the submitted value";
const ACCESS_DENIED: &str = "access grant is invalid or has expired";

/// Handler error: a [`ServiceError`] rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::new(self.0.code(), self.0.message());
        (status, Json(body)).into_response()
    }
}

impl ApiError {
    /// Response for a missing, forged or expired access grant.
    pub fn access_denied() -> Self {
        Self(ServiceError::Forbidden(ACCESS_DENIED.into()))
    }

    fn rejected(status: StatusCode, detail: String, message: &str) -> Self {
        debug!(status = %status, detail = %detail, "request rejected");
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self(ServiceError::PayloadTooLarge(format!(
                "request body exceeds {MAX_REQUEST_BODY_BYTES} bytes"
            )));
        }
        Self(ServiceError::BadRequest(message.into()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "expected a request with `Content-Type: application/json`"
            }
            _ => "request body is not valid JSON of the expected shape",
        };
        Self::rejected(rejection.status(), rejection.body_text(), message)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::rejected(
            rejection.status(),
            rejection.body_text(),
            "query string is missing or has invalid parameters",
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::rejected(
            rejection.status(),
            rejection.body_text(),
            "invalid path parameters",
        )
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::rejected(
            rejection.status(),
            rejection.body_text(),
            "request body could not be read",
        )
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<CipherError> for ApiError {
    fn from(e: CipherError) -> Self {
        let mapped = match e {
            CipherError::MalformedCiphertext => ServiceError::BadRequest(e.to_string()),
            CipherError::Integrity => ServiceError::Unprocessable(VALUE_UNPROCESSABLE.into()),
            CipherError::AeadFailure => ServiceError::EncryptionFailure("encryption failed".into()),
            CipherError::Key(_) => {
                error!(error = %e, "field cipher key error");
                ServiceError::Internal("internal error".into())
            }
        };
        Self(mapped)
    }
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        let mapped = match e {
            VaultError::Validation(v) => ServiceError::BadRequest(v.to_string()),
            VaultError::NotFound(_) => ServiceError::NotFound(DOCUMENT_UNAVAILABLE.into()),
            VaultError::Integrity => ServiceError::Unprocessable(DOCUMENT_UNAVAILABLE.into()),
            VaultError::Access(AccessError::InvalidLifetime) => {
                ServiceError::BadRequest(AccessError::InvalidLifetime.to_string())
            }
            VaultError::Access(_) => return Self::access_denied(),
            VaultError::Encryption => {
                ServiceError::EncryptionFailure("document encryption failed".into())
            }
            VaultError::Storage(s) => {
                error!(error = %s, "document backend failure");
                ServiceError::Internal("storage backend unavailable".into())
            }
        };
        Self(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protect::{StorageError, ValidationError};

    fn status_of(e: impl Into<ApiError>) -> StatusCode {
        e.into().into_response().status()
    }

    #[test]
    fn vault_errors_map_to_statuses() {
        assert_eq!(
            status_of(VaultError::Validation(ValidationError::EmptyContent)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(VaultError::NotFound("c/x.pdf".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(VaultError::Integrity),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(VaultError::Access(AccessError::Expired)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(VaultError::Access(AccessError::InvalidLifetime)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(VaultError::Storage(StorageError::Backend("timeout".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn cipher_errors_map_to_statuses() {
        assert_eq!(
            status_of(CipherError::MalformedCiphertext),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CipherError::Integrity),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn not_found_and_integrity_share_a_generic_message() {
        let nf = ApiError::from(VaultError::NotFound("identity-docs/secret.pdf".into()));
        let integ = ApiError::from(VaultError::Integrity);
        assert_eq!(nf.0.message(), integ.0.message());
        assert!(!nf.0.message().contains("secret"));
    }

    #[test]
    fn forged_and_expired_grants_are_indistinguishable() {
        let forged = ApiError::from(VaultError::Access(AccessError::InvalidSignature));
        let expired = ApiError::from(VaultError::Access(AccessError::Expired));
        assert_eq!(forged.0.message(), expired.0.message());
    }

    #[test]
    fn validation_message_is_verbatim() {
        let e = ApiError::from(VaultError::Validation(ValidationError::DisallowedExtension(
            ".exe".into(),
        )));
        assert_eq!(
            e.0.message(),
            ValidationError::DisallowedExtension(".exe".into()).to_string()
        );
    }
}
