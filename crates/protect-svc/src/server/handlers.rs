//! Axum request handlers for all service endpoints.

use std::collections::BTreeMap;

use axum::{
    body::{Body, Bytes},
    extract::{
        rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{AccessUrlResponse, ErrorResponse, FieldValues, HealthResponse, StoredFileResponse},
    ServiceError,
};
use protect::vault::DEFAULT_ACCESS_MINUTES;
use protect::CipherError;
use serde::Deserialize;
use tracing::{info, warn};

use super::{error::ApiError, state::AppState};

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// `POST /fields/encrypt` — encrypt every value in the map.
///
/// `null` stays `null`; blank strings are returned unchanged.
pub async fn encrypt_fields(
    State(state): State<AppState>,
    req: Result<Json<FieldValues>, JsonRejection>,
) -> Result<Json<FieldValues>, ApiError> {
    let Json(req) = req?;
    let values: BTreeMap<_, _> = req
        .values
        .into_iter()
        .map(|(name, value)| -> Result<_, CipherError> {
            let token = state.cipher.encrypt_optional(value.as_deref())?;
            Ok((name, token))
        })
        .collect::<Result<_, CipherError>>()?;
    Ok(Json(FieldValues { values }))
}

/// `POST /fields/decrypt` — decrypt every value in the map.
///
/// Fails as a whole on the first value that does not decrypt.
pub async fn decrypt_fields(
    State(state): State<AppState>,
    req: Result<Json<FieldValues>, JsonRejection>,
) -> Result<Json<FieldValues>, ApiError> {
    let Json(req) = req?;
    let values: BTreeMap<_, _> = req
        .values
        .into_iter()
        .map(|(name, token)| -> Result<_, CipherError> {
            let value = state
                .cipher
                .decrypt_optional(token.as_deref())
                .map_err(|e| {
                    warn!(field = %name, error = %e, "field decryption rejected");
                    e
                })?;
            Ok((name, value))
        })
        .collect::<Result<_, CipherError>>()?;
    Ok(Json(FieldValues { values }))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

fn default_encrypt() -> bool {
    true
}

/// Query string of `POST /files/{container}`.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Original file name supplied by the uploader.
    pub name: String,
    /// Advisory; documents are encrypted regardless.
    #[serde(default = "default_encrypt")]
    pub encrypt: bool,
}

/// `POST /files/{container}?name=<file name>` — store the raw request body.
pub async fn upload_file(
    State(state): State<AppState>,
    container: Result<Path<String>, PathRejection>,
    params: Result<Query<UploadParams>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<StoredFileResponse>), ApiError> {
    let Path(container) = container?;
    let Query(params) = params?;
    let body = body?;
    let path = state
        .vault
        .save_file(&body, &container, &params.name, params.encrypt)
        .await?;
    Ok((StatusCode::CREATED, Json(StoredFileResponse { path })))
}

/// Query string of `POST /files/{container}/{name}/access`.
#[derive(Debug, Deserialize)]
pub struct AccessParams {
    pub expiration_minutes: Option<u32>,
}

/// `POST /files/{container}/{name}/access` — issue a signed download URL.
pub async fn create_access_url(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    params: Result<Query<AccessParams>, QueryRejection>,
) -> Result<Json<AccessUrlResponse>, ApiError> {
    let Path((container, name)) = path?;
    let Query(params) = params?;
    let minutes = params.expiration_minutes.unwrap_or(DEFAULT_ACCESS_MINUTES);
    if minutes > state.access_url_max_minutes {
        return Err(ServiceError::BadRequest(format!(
            "expiration_minutes must not exceed {}",
            state.access_url_max_minutes
        ))
        .into());
    }

    let access = state
        .vault
        .get_temporary_access_url(&format!("{container}/{name}"), minutes)?;
    Ok(Json(AccessUrlResponse {
        url: access.url,
        expires_at: access.expires_at.to_rfc3339(),
    }))
}

/// Query string of a signed download URL.
#[derive(Debug, Deserialize)]
pub struct GrantParams {
    pub expires: i64,
    pub signature: String,
}

/// `GET /files/{container}/{name}?expires=..&signature=..` — verify the grant,
/// then return the decrypted document.
///
/// A missing or unparsable grant is refused like a forged one.
pub async fn download_file(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    grant: Result<Query<GrantParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Path((container, name)) = path?;
    let Query(grant) = grant.map_err(|_| ApiError::access_denied())?;
    let path = format!("{container}/{name}");
    let file = state
        .vault
        .get_file_with_grant(&path, grant.expires, &grant.signature)
        .await?;
    info!(path = %path, size = file.len(), "document served");

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&name)),
            (header::CACHE_CONTROL, "no-store"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Body::from(file.into_bytes()),
    )
        .into_response())
}

/// `DELETE /files/{container}/{name}` — soft-delete; absent documents are a no-op.
pub async fn delete_file(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((container, name)) = path?;
    state
        .vault
        .delete_file(&format!("{container}/{name}"))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map_or("", |(_, ext)| ext);
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

/// `GET /health` — liveness check reporting the active backend.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        backend: state.vault.backend_name().into(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}
