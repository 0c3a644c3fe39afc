//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use protect::{DocumentVault, FieldCipher};

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable so that Axum can clone the state for each
/// request without copying key material.
#[derive(Clone)]
pub struct AppState {
    /// Field-level encryption under the service key.
    pub cipher: Arc<FieldCipher>,
    /// Encrypted document store.
    pub vault: Arc<DocumentVault>,
    /// Longest lifetime a caller may request for an access URL.
    pub access_url_max_minutes: u32,
}

impl AppState {
    /// Create a new [`AppState`] from the initialised components.
    pub fn new(cipher: FieldCipher, vault: DocumentVault, access_url_max_minutes: u32) -> Self {
        Self {
            cipher: Arc::new(cipher),
            vault: Arc::new(vault),
            access_url_max_minutes,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use chrono::{DateTime, TimeZone, Utc};
    use protect::{BlobStore, FilesystemStore, FixedClock, MasterKey, KEY_LEN};

    use super::*;

    pub const BASE_URL: &str = "https://clinic.test/vault";

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    /// State over a filesystem store rooted at `root`, with the clock pinned
    /// to `now`. Two states built with the same `root` see the same documents.
    pub fn state_at(root: &Path, now: DateTime<Utc>) -> AppState {
        let master = MasterKey::from_bytes(&[7u8; KEY_LEN]).unwrap();
        let store: Arc<dyn BlobStore> = Arc::new(FilesystemStore::new(root));
        let vault = DocumentVault::new(&master, store, BASE_URL)
            .unwrap()
            .with_clock(Arc::new(FixedClock(now)));
        AppState::new(FieldCipher::new(&master).unwrap(), vault, 120)
    }
}
