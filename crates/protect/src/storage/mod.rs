//! Blob backend abstraction for the document vault.
//!
//! A backend stores opaque byte objects addressed by `container/name` and
//! exposes exactly four primitives: create, read, rename and exists. The vault
//! never relies on backend transactions or versioning.
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** Backends only ever see sealed bytes.
//! - `create` never overwrites an existing object.

pub mod fs;

pub use fs::FilesystemStore;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Address of one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    container: String,
    name: String,
}

impl ObjectKey {
    /// Build a key from its two components. No validation is performed here;
    /// backends must still refuse components that escape their namespace.
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
        }
    }

    /// The logical bucket.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// The object name inside the container.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.name)
    }
}

/// Errors produced by blob backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object exists at the key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// An object already exists at the key.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// The key cannot be mapped safely onto the backend namespace.
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Local I/O failure.
    #[error("storage i/o error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure (remote service error, timeout, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Object storage primitives the vault is built on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Short backend identifier for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Store `data` at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the key is taken.
    async fn create(&self, key: &ObjectKey, data: Bytes) -> Result<(), StorageError>;

    /// Read the full object at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no object exists.
    async fn read(&self, key: &ObjectKey) -> Result<Bytes, StorageError>;

    /// Move the object at `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `from` does not exist and
    /// [`StorageError::AlreadyExists`] if `to` does.
    async fn rename(&self, from: &ObjectKey, to: &ObjectKey) -> Result<(), StorageError>;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &ObjectKey) -> Result<bool, StorageError>;
}

impl fmt::Debug for dyn BlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobStore({})", self.backend_name())
    }
}
