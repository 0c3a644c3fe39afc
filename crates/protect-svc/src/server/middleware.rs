//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, body limits and response
//! compression.

use std::time::Duration;

use axum::{body::Body, http::Request};
use protect::vault::MAX_FILE_SIZE_BYTES;
use tracing::Span;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest request body accepted. Slightly above the document limit so that an
/// oversized upload reaches validation and gets its specific message.
pub const MAX_REQUEST_BODY_BYTES: usize = MAX_FILE_SIZE_BYTES + 1024 * 1024;

/// Request span carrying the method and path only.
///
/// The query string is left out: it holds access-grant signatures.
pub fn request_span(req: &Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_admits_largest_document() {
        assert!(MAX_REQUEST_BODY_BYTES > MAX_FILE_SIZE_BYTES);
    }
}
