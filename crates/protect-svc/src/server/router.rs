//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/fields/encrypt", post(handlers::encrypt_fields))
        .route("/fields/decrypt", post(handlers::decrypt_fields))
        .route("/files/:container", post(handlers::upload_file))
        .route(
            "/files/:container/:name",
            get(handlers::download_file).delete(handlers::delete_file),
        )
        .route(
            "/files/:container/:name/access",
            post(handlers::create_access_url),
        )
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(middleware::MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http().make_span_with(middleware::request_span))
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::state::test_support::{state_at, t0};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use chrono::Duration;
    use serde_json::Value;
    use tower::ServiceExt;

    const SCAN: &[u8] = b"%PDF-1.7\n\x00\xff\x10 signed consent form";

    async fn send(app: Router, method: &str, uri: &str, body: Body) -> Response {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Uploads [`SCAN`] and returns its stored path.
    async fn upload(state: &AppState) -> String {
        let resp = send(
            build(state.clone()),
            "POST",
            "/files/identity-docs?name=consent%20form.pdf",
            Body::from(SCAN),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        json_body(resp).await["path"].as_str().unwrap().to_owned()
    }

    /// Issues an access URL for `path` and returns its path-and-query part.
    async fn grant(state: &AppState, path: &str, minutes: u32) -> String {
        let resp = send(
            build(state.clone()),
            "POST",
            &format!("/files/{path}/access?expiration_minutes={minutes}"),
            Body::empty(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let url = json_body(resp).await["url"].as_str().unwrap().to_owned();
        url.strip_prefix(crate::server::state::test_support::BASE_URL)
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let dir = tempfile::tempdir().unwrap();
        let resp = send(
            build(state_at(dir.path(), t0())),
            "GET",
            "/unknown",
            Body::empty(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let dir = tempfile::tempdir().unwrap();
        let resp = send(
            build(state_at(dir.path(), t0())),
            "GET",
            "/health",
            Body::empty(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn upload_grant_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_at(dir.path(), t0());
        let path = upload(&state).await;
        assert!(path.starts_with("identity-docs/"));
        assert!(path.ends_with("_consent_form.pdf"));

        let link = grant(&state, &path, 15).await;
        let resp = send(build(state), "GET", &link, Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), SCAN);
    }

    #[tokio::test]
    async fn stored_bytes_are_not_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_at(dir.path(), t0());
        let path = upload(&state).await;
        let on_disk = std::fs::read(dir.path().join(&path)).unwrap();
        assert!(!on_disk.windows(SCAN.len()).any(|w| w == SCAN));
    }

    #[tokio::test]
    async fn download_without_grant_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_at(dir.path(), t0());
        let path = upload(&state).await;
        let resp = send(build(state), "GET", &format!("/files/{path}"), Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = json_body(resp).await;
        assert_eq!(body["code"], "forbidden");
        assert_eq!(body["message"], "access grant is invalid or has expired");
    }

    #[tokio::test]
    async fn unparsable_grant_is_refused_like_a_forged_one() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_at(dir.path(), t0());
        let path = upload(&state).await;
        let resp = send(
            build(state),
            "GET",
            &format!("/files/{path}?expires=soon&signature=abc"),
            Body::empty(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(resp).await["code"], "forbidden");
    }

    #[tokio::test]
    async fn upload_without_name_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let resp = send(
            build(state_at(dir.path(), t0())),
            "POST",
            "/files/identity-docs",
            Body::from(SCAN),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["code"], "bad_request");
        let message = body["message"].as_str().unwrap();
        assert!(!message.contains("Failed to deserialize"), "{message}");
    }

    #[tokio::test]
    async fn malformed_json_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/fields/encrypt")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = build(state_at(dir.path(), t0())).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["code"], "bad_request");
        assert!(!body["message"].as_str().unwrap().contains("Failed to parse"));
    }

    #[tokio::test]
    async fn missing_content_type_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let resp = send(
            build(state_at(dir.path(), t0())),
            "POST",
            "/fields/encrypt",
            Body::from(r#"{"values":{}}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["code"], "bad_request");
    }

    #[tokio::test]
    async fn body_over_limit_gets_json_413() {
        let dir = tempfile::tempdir().unwrap();
        let oversized = vec![0u8; middleware::MAX_REQUEST_BODY_BYTES + 1];
        let resp = send(
            build(state_at(dir.path(), t0())),
            "POST",
            "/files/identity-docs?name=scan.pdf",
            Body::from(oversized),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(resp).await["code"], "payload_too_large");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn grant_for_another_document_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_at(dir.path(), t0());
        let first = upload(&state).await;
        let second = upload(&state).await;

        let link = grant(&state, &first, 15).await;
        let query = link.split_once('?').unwrap().1;
        let resp = send(
            build(state),
            "GET",
            &format!("/files/{second}?{query}"),
            Body::empty(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn expired_grant_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let issuing = state_at(dir.path(), t0());
        let path = upload(&issuing).await;
        let link = grant(&issuing, &path, 15).await;

        let later = state_at(dir.path(), t0() + Duration::minutes(16));
        let resp = send(build(later), "GET", &link, Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(resp).await["code"], "forbidden");
    }

    #[tokio::test]
    async fn lifetime_above_maximum_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_at(dir.path(), t0());
        let path = upload(&state).await;
        let resp = send(
            build(state),
            "POST",
            &format!("/files/{path}/access?expiration_minutes=121"),
            Body::empty(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let resp = send(
            build(state_at(dir.path(), t0())),
            "POST",
            "/files/identity-docs?name=payload.exe",
            Body::from("MZ"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert!(body["message"].as_str().unwrap().contains("\".exe\""));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn deleted_document_is_not_found_even_with_valid_grant() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_at(dir.path(), t0());
        let path = upload(&state).await;
        let link = grant(&state, &path, 15).await;

        let resp = send(
            build(state.clone()),
            "DELETE",
            &format!("/files/{path}"),
            Body::empty(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(build(state.clone()), "GET", &link, Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(resp).await["message"],
            "unable to process the requested document"
        );

        // Second delete is a no-op.
        let resp = send(build(state), "DELETE", &format!("/files/{path}"), Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
