//! Master key handling and HKDF-SHA256 subkey derivation.
//!
//! The service holds exactly one master key, supplied once at construction as
//! a Base64 string. Components never use the master key directly: each one
//! derives its own purpose-bound [`SubKey`] so that field tokens, stored files
//! and access-grant signatures are cryptographically separated.
//!
//! # Security invariants
//!
//! - Key material is **never** logged or printed; `Debug` output is redacted.
//! - Key buffers are zeroed on drop.

use aes_gcm_siv::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Byte length of the master key and of every derived subkey (256 bits).
pub const KEY_LEN: usize = 32;

/// HKDF salt shared by all subkeys; the per-purpose `info` label provides
/// domain separation.
const HKDF_SALT: &[u8] = b"protect/v1/subkey";

/// Errors produced while constructing keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The encoded key is not valid Base64.
    #[error("encryption key is not valid base64")]
    InvalidEncoding,

    /// The decoded key material has the wrong length.
    #[error("invalid encryption key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// HKDF expansion failed.
    #[error("subkey derivation failed")]
    Derivation,
}

/// What a derived subkey is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    /// AEAD key for field tokens.
    FieldEncryption,
    /// AEAD key for documents at rest.
    FileEncryption,
    /// HMAC key for temporary access grants.
    AccessSigning,
}

impl KeyPurpose {
    fn label(self) -> &'static [u8] {
        match self {
            KeyPurpose::FieldEncryption => b"field-encryption",
            KeyPurpose::FileEncryption => b"file-encryption",
            KeyPurpose::AccessSigning => b"access-signing",
        }
    }
}

/// The single long-lived 256-bit secret a service instance is built from.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Decode a Base64 key string (surrounding whitespace is ignored).
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidEncoding`] if the string is not Base64 and
    /// [`KeyError::InvalidLength`] if it does not decode to [`KEY_LEN`] bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let mut decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyError::InvalidEncoding)?;
        let key = Self::from_bytes(&decoded);
        decoded.zeroize();
        key
    }

    /// Build a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if `bytes` is not [`KEY_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut buf = [0u8; KEY_LEN];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Derive the subkey for `purpose` with HKDF-SHA256.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Derivation`] if HKDF expansion fails.
    pub fn derive(&self, purpose: KeyPurpose) -> Result<SubKey, KeyError> {
        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), &self.0);
        let mut okm = [0u8; KEY_LEN];
        hk.expand(purpose.label(), &mut okm)
            .map_err(|_| KeyError::Derivation)?;
        Ok(SubKey(okm))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

/// A purpose-bound key derived from a [`MasterKey`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SubKey([u8; KEY_LEN]);

impl SubKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SubKey([REDACTED])")
    }
}

/// Generate a fresh random key in the Base64 encoding [`MasterKey::from_base64`]
/// expects.
///
/// Intended for provisioning a new deployment, not for per-message randomness.
pub fn generate_key() -> String {
    let mut key = random_bytes::<KEY_LEN>();
    let encoded = STANDARD.encode(key);
    key.zeroize();
    encoded
}

/// Fill a fixed-size buffer from the OS CSPRNG.
pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_decodes_to_32_bytes() {
        let encoded = generate_key();
        assert_eq!(STANDARD.decode(&encoded).unwrap().len(), KEY_LEN);
        assert!(MasterKey::from_base64(&encoded).is_ok());
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(generate_key(), generate_key());
    }

    #[test]
    fn rejects_invalid_base64() {
        assert_eq!(
            MasterKey::from_base64("not base64 at all!").unwrap_err(),
            KeyError::InvalidEncoding
        );
    }

    #[test]
    fn rejects_wrong_length() {
        let short = STANDARD.encode([7u8; 16]);
        assert_eq!(
            MasterKey::from_base64(&short).unwrap_err(),
            KeyError::InvalidLength(16)
        );
        let long = STANDARD.encode([7u8; 33]);
        assert_eq!(
            MasterKey::from_base64(&long).unwrap_err(),
            KeyError::InvalidLength(33)
        );
    }

    #[test]
    fn ignores_surrounding_whitespace() {
        let encoded = format!("  {}\n", generate_key());
        assert!(MasterKey::from_base64(&encoded).is_ok());
    }

    #[test]
    fn subkeys_are_deterministic_and_separated() {
        let master = MasterKey::from_bytes(&[0x42; KEY_LEN]).unwrap();
        let a = master.derive(KeyPurpose::FieldEncryption).unwrap();
        let b = master.derive(KeyPurpose::FieldEncryption).unwrap();
        let c = master.derive(KeyPurpose::FileEncryption).unwrap();
        let d = master.derive(KeyPurpose::AccessSigning).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
        assert_ne!(c.as_bytes(), d.as_bytes());
        assert_ne!(a.as_bytes(), &[0x42; KEY_LEN]);
    }

    #[test]
    fn key_material_redacted_in_debug() {
        let master = MasterKey::from_bytes(&[0xAB; KEY_LEN]).unwrap();
        let sub = master.derive(KeyPurpose::AccessSigning).unwrap();
        assert!(format!("{master:?}").contains("REDACTED"));
        assert!(format!("{sub:?}").contains("REDACTED"));
        assert!(!format!("{master:?}").contains("171"));
    }
}
