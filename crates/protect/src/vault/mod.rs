//! Encrypted document storage with soft deletion and signed access grants.
//!
//! # Object layout
//!
//! ```text
//! [ nonce (12 bytes) ][ AES-256-GCM-SIV ciphertext + tag ]
//! ```
//!
//! The stored path (`container/name`) is bound to the ciphertext as associated
//! data, so an object copied or moved to another address fails verification.
//!
//! # Module invariants
//!
//! - Nothing is written before validation passes.
//! - Every document is encrypted; [`StoragePolicy::AlwaysEncrypted`] overrides
//!   a caller asking otherwise.
//! - Not-found is reported distinctly from integrity failures.
//! - No caching: every read re-fetches and re-verifies.

pub mod naming;
pub mod tombstone;
pub mod validation;

pub use naming::{parse_stored_path, sanitize_file_name, validate_container};
pub use tombstone::Tombstone;
pub use validation::{
    is_valid_file, validate_file, ValidationError, ALLOWED_EXTENSIONS, MAX_FILE_SIZE_BYTES,
};

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::access::{AccessError, AccessSigner};
use crate::cipher::{open, seal};
use crate::clock::{Clock, SystemClock};
use crate::keys::{KeyError, KeyPurpose, MasterKey, SubKey};
use crate::storage::{BlobStore, ObjectKey, StorageError};

/// Grant lifetime used when the caller does not ask for one.
pub const DEFAULT_ACCESS_MINUTES: u32 = 60;

/// How the vault treats a caller's request to skip encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoragePolicy {
    /// Documents are always encrypted; the caller's flag is advisory only.
    #[default]
    AlwaysEncrypted,
}

/// Errors produced by [`DocumentVault`] operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The upload or path was rejected before touching the backend.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No live document exists at the path.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The stored bytes did not decrypt under the service key.
    #[error("document failed integrity verification")]
    Integrity,

    /// The access grant was not valid.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Sealing the document failed.
    #[error("document encryption failed")]
    Encryption,

    /// The backend failed.
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for VaultError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(path) => VaultError::NotFound(path),
            other => VaultError::Storage(other),
        }
    }
}

/// Decrypted content of one stored document.
#[derive(Debug, Clone)]
pub struct DecryptedFile {
    path: String,
    content: Bytes,
}

impl DecryptedFile {
    /// Stored path the content was read from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Plaintext length in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the plaintext is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Borrow the plaintext.
    pub fn bytes(&self) -> &Bytes {
        &self.content
    }

    /// Take the plaintext without copying.
    pub fn into_bytes(self) -> Bytes {
        self.content
    }

    /// The content as a reader positioned at its start.
    pub fn into_reader(self) -> Cursor<Bytes> {
        Cursor::new(self.content)
    }
}

/// A signed download URL and the instant it stops working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryAccessUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Encrypted document store over a [`BlobStore`].
///
/// Holds only immutable state; share it behind an `Arc`.
#[derive(Debug)]
pub struct DocumentVault {
    store: Arc<dyn BlobStore>,
    file_key: SubKey,
    signer: AccessSigner,
    clock: Arc<dyn Clock>,
    base_url: String,
    policy: StoragePolicy,
}

impl DocumentVault {
    /// Build a vault whose access URLs are rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if the file or signing subkeys cannot be derived.
    pub fn new(
        master: &MasterKey,
        store: Arc<dyn BlobStore>,
        base_url: impl Into<String>,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            store,
            file_key: master.derive(KeyPurpose::FileEncryption)?,
            signer: AccessSigner::new(master)?,
            clock: Arc::new(SystemClock),
            base_url: base_url.into(),
            policy: StoragePolicy::default(),
        })
    }

    /// Replace the wall clock, e.g. with a [`crate::clock::FixedClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Identifier of the underlying backend.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Validate, encrypt and store a document, returning its stored path.
    ///
    /// `encrypt` records what the caller asked for; under
    /// [`StoragePolicy::AlwaysEncrypted`] a `false` is overridden with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Validation`] (nothing written) for an empty,
    /// oversized, disallowed or null-byte-bearing upload or a bad container,
    /// and [`VaultError::Storage`] if the backend write fails.
    pub async fn save_file(
        &self,
        content: &[u8],
        container: &str,
        file_name: &str,
        encrypt: bool,
    ) -> Result<String, VaultError> {
        match self.policy {
            StoragePolicy::AlwaysEncrypted if !encrypt => {
                warn!(
                    container = %container,
                    "encryption is mandatory for this operation; the requested flag is advisory only"
                );
            }
            StoragePolicy::AlwaysEncrypted => {}
        }

        validate_container(container)?;
        validate_file(content, file_name, ALLOWED_EXTENSIONS, MAX_FILE_SIZE_BYTES)?;

        let key = ObjectKey::new(container, naming::unique_file_name(file_name));
        let path = key.to_string();
        let sealed = seal(&self.file_key, content, path.as_bytes())
            .map_err(|_| VaultError::Encryption)?;

        self.store.create(&key, Bytes::from(sealed)).await?;
        info!(path = %path, size = content.len(), "document stored");
        Ok(path)
    }

    /// Read and decrypt a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NotFound`] if nothing is stored at `path` (including
    /// after deletion), [`VaultError::Integrity`] if the bytes do not verify, and
    /// [`VaultError::Validation`] if `path` is not a stored path at all.
    pub async fn get_file(&self, path: &str) -> Result<DecryptedFile, VaultError> {
        let key = parse_stored_path(path)?;
        let sealed = self.store.read(&key).await?;
        let content = open(&self.file_key, &sealed, path.as_bytes()).map_err(|_| {
            warn!(path = %key, "stored document failed integrity verification");
            VaultError::Integrity
        })?;
        debug!(path = %key, size = content.len(), "document decrypted");
        Ok(DecryptedFile {
            path: key.to_string(),
            content: Bytes::from(content),
        })
    }

    /// Soft-delete a document by renaming it to its [`Tombstone`] key.
    ///
    /// Deleting a path that holds nothing is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Validation`] for a malformed path and
    /// [`VaultError::Storage`] if the backend fails.
    pub async fn delete_file(&self, path: &str) -> Result<(), VaultError> {
        let key = parse_stored_path(path)?;
        if !self.store.exists(&key).await? {
            debug!(path = %key, "delete requested for absent document; nothing to do");
            return Ok(());
        }

        let tombstone = Tombstone::new(key.clone(), self.clock.now());
        match self.store.rename(&key, &tombstone.key()).await {
            Ok(()) => {
                info!(path = %key, deleted_at = %tombstone.deleted_at, "document soft-deleted");
                Ok(())
            }
            // Lost a race with a concurrent delete.
            Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Issue a signed URL granting read access to `path` for
    /// `expiration_minutes` (see [`DEFAULT_ACCESS_MINUTES`]).
    ///
    /// No record of the grant is kept.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Validation`] for a malformed path and
    /// [`VaultError::Access`] for a zero lifetime.
    pub fn get_temporary_access_url(
        &self,
        path: &str,
        expiration_minutes: u32,
    ) -> Result<TemporaryAccessUrl, VaultError> {
        let key = parse_stored_path(path)?;
        let grant = self
            .signer
            .issue(&key.to_string(), expiration_minutes, self.clock.now())?;
        debug!(path = %key, expires_at = %grant.expires_at, "access grant issued");
        Ok(TemporaryAccessUrl {
            url: grant.to_url(&self.base_url),
            expires_at: grant.expires_at,
        })
    }

    /// Check a presented grant: the signature must match and the current time
    /// must be before `expires`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Access`] with [`AccessError::InvalidSignature`] or
    /// [`AccessError::Expired`].
    pub fn verify_access(&self, path: &str, expires: i64, signature: &str) -> Result<(), VaultError> {
        let key = parse_stored_path(path)?;
        self.signer
            .verify(&key.to_string(), expires, signature, self.clock.now())
            .map_err(|e| {
                debug!(path = %key, reason = %e, "access grant rejected");
                VaultError::Access(e)
            })
    }

    /// [`DocumentVault::verify_access`] followed by [`DocumentVault::get_file`].
    ///
    /// # Errors
    ///
    /// Any error of either step; the grant is checked before the backend is read.
    pub async fn get_file_with_grant(
        &self,
        path: &str,
        expires: i64,
        signature: &str,
    ) -> Result<DecryptedFile, VaultError> {
        self.verify_access(path, expires, signature)?;
        self.get_file(path).await
    }
}
