//! Stored-name generation and stored-path parsing.
//!
//! Every stored name has the shape `<uuid simple>_<sanitized original>`, built
//! only from ASCII alphanumerics, `.`, `-` and `_`. Anything presented back to
//! the vault as a stored path must satisfy the same alphabet, so tombstone
//! names (which contain `~`) and traversal attempts are unaddressable.

use uuid::Uuid;

use super::validation::{extension, ValidationError};
use crate::storage::ObjectKey;

/// Cap on the sanitized part of a stored name, extension included.
pub const MAX_SANITIZED_LEN: usize = 100;

/// Name used when nothing survives sanitization.
const FALLBACK_STEM: &str = "file";

const MAX_CONTAINER_LEN: usize = 63;
const MIN_CONTAINER_LEN: usize = 3;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn clean(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if is_name_char(c) {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

/// Reduce an uploaded file name to a safe, bounded name that keeps its extension.
///
/// Directory components are discarded, characters outside the stored-name
/// alphabet are stripped, whitespace becomes `_` and leading dots are removed.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let mut ext = clean(extension(base)).to_ascii_lowercase();
    // Leave room for the fallback stem and the separating dot.
    ext.truncate(MAX_SANITIZED_LEN - FALLBACK_STEM.len() - 1);
    let stem_raw = match base.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => base,
    };

    let stem_budget = MAX_SANITIZED_LEN.saturating_sub(ext.len() + 1).max(1);
    let mut stem: String = clean(stem_raw).trim_start_matches('.').to_owned();
    stem.truncate(stem_budget);
    let stem = stem.trim_end_matches('.');
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

    if ext.is_empty() {
        stem.to_owned()
    } else {
        format!("{stem}.{ext}")
    }
}

/// Fresh collision-free stored name for an upload.
pub fn unique_file_name(file_name: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), sanitize_file_name(file_name))
}

/// Check a container name: 3-63 chars of lowercase ASCII letters, digits and
/// single hyphens, starting and ending with a letter or digit.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidContainer`] on any violation.
pub fn validate_container(container: &str) -> Result<(), ValidationError> {
    let len_ok = (MIN_CONTAINER_LEN..=MAX_CONTAINER_LEN).contains(&container.len());
    let chars_ok = container
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let edges_ok = !container.starts_with('-') && !container.ends_with('-');
    if len_ok && chars_ok && edges_ok && !container.contains("--") {
        Ok(())
    } else {
        Err(ValidationError::InvalidContainer(container.to_owned()))
    }
}

/// Parse a `container/name` path previously returned by the vault.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidContainer`] for a bad container and
/// [`ValidationError::InvalidPath`] for anything else that is not a
/// well-formed stored path.
pub fn parse_stored_path(path: &str) -> Result<ObjectKey, ValidationError> {
    let invalid = || ValidationError::InvalidPath(path.to_owned());
    let (container, name) = path.split_once('/').ok_or_else(invalid)?;
    validate_container(container)?;

    let name_ok = !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name.chars().all(is_name_char);
    if !name_ok {
        return Err(invalid());
    }
    Ok(ObjectKey::new(container, name))
}
