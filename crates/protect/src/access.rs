//! Stateless, time-boxed access grants for stored documents.
//!
//! A grant is the triple `{path, expiry, signature}` where
//!
//! ```text
//! signature = base64url( HMAC-SHA256(access-signing subkey, path || "\n" || expiry) )
//! ```
//!
//! and `expiry` is a Unix timestamp in seconds. Nothing is persisted: a grant
//! is verified by recomputing the signature, comparing it in constant time,
//! and checking that the current time is strictly before the expiry.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use crate::keys::{KeyError, KeyPurpose, MasterKey, KEY_LEN};

type HmacSha256 = Hmac<Sha256>;

/// Errors produced when issuing or verifying a grant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The signature does not match the path and expiry.
    #[error("access grant signature is invalid")]
    InvalidSignature,

    /// The grant's expiry is not in the future.
    #[error("access grant has expired")]
    Expired,

    /// The requested lifetime is zero or not representable.
    #[error("access grant lifetime must be at least one minute")]
    InvalidLifetime,
}

/// A signed, time-bounded reference to one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessGrant {
    /// Stored path (`container/name`) the grant covers.
    pub path: String,
    /// Instant at which the grant stops being valid.
    pub expires_at: DateTime<Utc>,
    /// URL-safe Base64 HMAC over the path and expiry.
    pub signature: String,
}

impl AccessGrant {
    /// Render the grant as a download URL under `base_url`.
    pub fn to_url(&self, base_url: &str) -> String {
        format!(
            "{}/files/{}?expires={}&signature={}",
            base_url.trim_end_matches('/'),
            self.path,
            self.expires_at.timestamp(),
            self.signature,
        )
    }
}

/// Issues and verifies [`AccessGrant`]s.
#[derive(Clone)]
pub struct AccessSigner {
    mac: HmacSha256,
}

impl AccessSigner {
    /// Build a signer keyed with the access-signing subkey of `master`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if the subkey cannot be derived.
    pub fn new(master: &MasterKey) -> Result<Self, KeyError> {
        let key = master.derive(KeyPurpose::AccessSigning)?;
        let mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|_| KeyError::InvalidLength(KEY_LEN))?;
        Ok(Self { mac })
    }

    /// Issue a grant for `path` valid for `lifetime_minutes` from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvalidLifetime`] if `lifetime_minutes` is zero.
    pub fn issue(
        &self,
        path: &str,
        lifetime_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<AccessGrant, AccessError> {
        if lifetime_minutes == 0 {
            return Err(AccessError::InvalidLifetime);
        }
        let expires = now.timestamp() + i64::from(lifetime_minutes) * 60;
        let expires_at =
            DateTime::<Utc>::from_timestamp(expires, 0).ok_or(AccessError::InvalidLifetime)?;
        Ok(AccessGrant {
            path: path.to_owned(),
            expires_at,
            signature: URL_SAFE_NO_PAD.encode(self.tag(path, expires)),
        })
    }

    /// Verify a presented grant against `now`.
    ///
    /// The signature is checked first, so a grant whose expiry was edited is
    /// reported as [`AccessError::InvalidSignature`] rather than accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvalidSignature`] if the signature does not
    /// match, and [`AccessError::Expired`] if `now` is at or past `expires`.
    pub fn verify(
        &self,
        path: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AccessError> {
        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AccessError::InvalidSignature)?;
        let mut mac = self.mac.clone();
        mac.update(&signed_message(path, expires));
        mac.verify_slice(&presented)
            .map_err(|_| AccessError::InvalidSignature)?;

        if now.timestamp() >= expires {
            return Err(AccessError::Expired);
        }
        Ok(())
    }

    fn tag(&self, path: &str, expires: i64) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(&signed_message(path, expires));
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for AccessSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessSigner([REDACTED])")
    }
}

fn signed_message(path: &str, expires: i64) -> Vec<u8> {
    format!("{path}\n{expires}").into_bytes()
}
