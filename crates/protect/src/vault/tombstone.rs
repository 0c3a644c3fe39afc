//! Soft-delete markers.
//!
//! A deleted document is renamed to `<name>~deleted-<YYYYMMDDTHHMMSSZ>` in the
//! same container. `~` is outside the stored-name alphabet, so a tombstone can
//! never be reached through a stored path. Purging tombstones past the
//! retention window is done by an external scheduled job, which uses
//! [`Tombstone::parse`] instead of picking names apart itself.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::storage::ObjectKey;

const MARKER: &str = "~deleted-";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A deleted document: where it used to live and when it was deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tombstone {
    /// The key the document had while it was alive.
    pub original: ObjectKey,
    /// Deletion instant, truncated to whole seconds.
    pub deleted_at: DateTime<Utc>,
}

impl Tombstone {
    pub fn new(original: ObjectKey, deleted_at: DateTime<Utc>) -> Self {
        Self {
            original,
            deleted_at: deleted_at.trunc_subsecs(0),
        }
    }

    /// Backend key the deleted object is moved to.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(
            self.original.container(),
            format!(
                "{}{MARKER}{}",
                self.original.name(),
                self.deleted_at.format(TIMESTAMP_FORMAT)
            ),
        )
    }

    /// Recognise a tombstone key. Returns `None` for live objects.
    pub fn parse(key: &ObjectKey) -> Option<Self> {
        let (name, stamp) = key.name().rsplit_once(MARKER)?;
        let deleted_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .ok()?
            .and_utc();
        Some(Self {
            original: ObjectKey::new(key.container(), name),
            deleted_at,
        })
    }
}
