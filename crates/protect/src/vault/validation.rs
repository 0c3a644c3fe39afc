//! Upload preconditions, checked before any byte reaches the backend.

use thiserror::Error;

/// Largest document the vault accepts (10 MiB).
pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Extensions accepted for identity and consent documents.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".pdf"];

/// Caller-correctable problems with an upload or a stored path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file content is empty")]
    EmptyContent,

    #[error("file size {size} bytes exceeds the maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("file extension {0:?} is not allowed")]
    DisallowedExtension(String),

    #[error("file name contains an embedded null byte")]
    NullByte,

    #[error("invalid container name: {0:?}")]
    InvalidContainer(String),

    #[error("invalid stored path: {0:?}")]
    InvalidPath(String),
}

/// Check `content` and `file_name` against an extension allow-list and a size cap.
///
/// Extensions in `allowed_extensions` may be written with or without the
/// leading dot and are compared case-insensitively.
///
/// # Errors
///
/// Returns the first failing [`ValidationError`], checked in this order:
/// empty content, embedded null byte, size, extension.
pub fn validate_file(
    content: &[u8],
    file_name: &str,
    allowed_extensions: &[&str],
    max_size_bytes: usize,
) -> Result<(), ValidationError> {
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    if file_name.contains('\0') {
        return Err(ValidationError::NullByte);
    }
    if content.len() > max_size_bytes {
        return Err(ValidationError::TooLarge {
            size: content.len(),
            max: max_size_bytes,
        });
    }

    let ext = extension(file_name);
    let allowed = !ext.is_empty()
        && allowed_extensions
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext));
    if !allowed {
        let shown = if ext.is_empty() {
            String::new()
        } else {
            format!(".{ext}")
        };
        return Err(ValidationError::DisallowedExtension(shown));
    }
    Ok(())
}

/// Boolean form of [`validate_file`] for callers that only need pass/fail.
pub fn is_valid_file(
    content: &[u8],
    file_name: &str,
    allowed_extensions: &[&str],
    max_size_bytes: usize,
) -> bool {
    validate_file(content, file_name, allowed_extensions, max_size_bytes).is_ok()
}

/// Extension of the last path component, without the dot (`""` if none).
pub(crate) fn extension(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rsplit_once('.').map_or("", |(_, ext)| ext)
}
