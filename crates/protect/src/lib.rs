//! Data-protection core for clinic records and documents.
//!
//! Two independent components share one key-derivation convention:
//!
//! - [`FieldCipher`] encrypts short sensitive text values into
//!   self-contained, tamper-evident tokens.
//! - [`DocumentVault`] stores uploaded documents encrypted at rest, reads them
//!   back transparently, soft-deletes them, and issues stateless signed access
//!   grants.
//!
//! Dependency order: [`keys`] → [`cipher`] → [`vault`] (which also uses
//! [`access`] and [`storage`]). Neither component depends on an HTTP layer.

pub mod access;
pub mod cipher;
pub mod clock;
pub mod keys;
pub mod storage;
pub mod vault;

pub use access::{AccessError, AccessGrant, AccessSigner};
pub use cipher::{CipherError, FieldCipher};
pub use clock::{Clock, FixedClock, SystemClock};
pub use keys::{generate_key, KeyError, MasterKey, KEY_LEN};
pub use storage::{BlobStore, FilesystemStore, ObjectKey, StorageError};
pub use vault::{
    DecryptedFile, DocumentVault, StoragePolicy, TemporaryAccessUrl, ValidationError, VaultError,
};
