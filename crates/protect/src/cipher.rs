//! AES-256-GCM-SIV encryption and decryption of individual text fields.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! A fresh random nonce is still drawn for every call, so encrypting the same
//! value twice yields two different tokens.
//!
//! # Token format
//!
//! ```text
//! base64( nonce (12 bytes) || ciphertext || tag (16 bytes) )
//! ```
//!
//! Blank values (empty or whitespace-only) pass through unchanged in both
//! directions: they carry nothing worth protecting, and blank form fields
//! round-trip exactly.

use aes_gcm_siv::{
    aead::{Aead, KeyInit, Payload},
    Aes256GcmSiv, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::keys::{random_bytes, KeyError, KeyPurpose, MasterKey, SubKey, KEY_LEN};

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Smallest decoded input that can possibly be a sealed value.
pub const MIN_SEALED_LEN: usize = NONCE_LEN + TAG_LEN;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The service key could not be constructed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The token is not decodable or too short to hold a nonce and tag.
    #[error("malformed ciphertext")]
    MalformedCiphertext,

    /// The authentication tag did not verify: wrong key or tampered data.
    #[error("ciphertext failed integrity verification")]
    Integrity,

    /// AES-GCM-SIV encryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Field-level cipher bound to one long-lived key.
///
/// Holds only an immutable derived key, so a single instance can be shared
/// across threads (`Arc<FieldCipher>`) with no coordination.
#[derive(Clone, Debug)]
pub struct FieldCipher {
    key: SubKey,
}

impl FieldCipher {
    /// Build a cipher from an already-decoded master key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Key`] if subkey derivation fails.
    pub fn new(master: &MasterKey) -> Result<Self, CipherError> {
        Ok(Self {
            key: master.derive(KeyPurpose::FieldEncryption)?,
        })
    }

    /// Build a cipher straight from a Base64 key string.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Key`] if the string is not Base64 or does not
    /// decode to exactly [`KEY_LEN`] bytes.
    pub fn from_base64_key(encoded: &str) -> Result<Self, CipherError> {
        Self::new(&MasterKey::from_base64(encoded)?)
    }

    /// Encrypt `plaintext` into a printable token.
    ///
    /// Blank input is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] on an internal AEAD error.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if is_blank(plaintext) {
            return Ok(plaintext.to_owned());
        }
        let sealed = seal(&self.key, plaintext.as_bytes(), &[])?;
        Ok(STANDARD.encode(sealed))
    }

    /// Decrypt and verify a token produced by [`FieldCipher::encrypt`].
    ///
    /// Blank input is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::MalformedCiphertext`] if the token does not
    /// decode or is too short, and [`CipherError::Integrity`] if
    /// authentication fails.
    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        if is_blank(token) {
            return Ok(token.to_owned());
        }
        let sealed = STANDARD
            .decode(token)
            .map_err(|_| CipherError::MalformedCiphertext)?;
        let plaintext = open(&self.key, &sealed, &[])?;
        String::from_utf8(plaintext).map_err(|_| CipherError::MalformedCiphertext)
    }

    /// [`FieldCipher::encrypt`] for optional values: `None` stays `None`.
    pub fn encrypt_optional(&self, plaintext: Option<&str>) -> Result<Option<String>, CipherError> {
        plaintext.map(|p| self.encrypt(p)).transpose()
    }

    /// [`FieldCipher::decrypt`] for optional values: `None` stays `None`.
    pub fn decrypt_optional(&self, token: Option<&str>) -> Result<Option<String>, CipherError> {
        token.map(|t| self.decrypt(t)).transpose()
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Encrypt `plaintext` under `key` with a fresh nonce, returning
/// `nonce || ciphertext || tag`. `aad` is authenticated but not stored.
pub(crate) fn seal(key: &SubKey, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce_bytes = random_bytes::<NONCE_LEN>();
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CipherError::AeadFailure)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Reverse [`seal`]: split off the leading nonce and decrypt-and-verify the rest.
pub(crate) fn open(key: &SubKey, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>, CipherError> {
    if sealed.len() < MIN_SEALED_LEN {
        return Err(CipherError::MalformedCiphertext);
    }
    let (nonce, body) = sealed.split_at(NONCE_LEN);
    let cipher = build_cipher(key)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: body, aad })
        .map_err(|_| CipherError::Integrity)
}

fn build_cipher(key: &SubKey) -> Result<Aes256GcmSiv, CipherError> {
    Aes256GcmSiv::new_from_slice(key.as_bytes())
        .map_err(|_| CipherError::Key(KeyError::InvalidLength(KEY_LEN)))
}
