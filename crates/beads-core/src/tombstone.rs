//! Tombstone records for deleted issues.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::issue::Issue;

/// Default number of days a tombstone survives before being purged from
/// the journal.
pub const DEFAULT_TTL_DAYS: i64 = 30;

/// A record that an issue was deleted.
///
/// Tombstones travel through the journal so that deletions propagate
/// across clones without losing concurrent edits: within the TTL a
/// tombstone wins over any older value, while a modification newer than
/// `deleted_at` resurrects the issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub id: String,

    /// Deletion time as recorded by the deleting side's clock. Never
    /// re-stamped by merges.
    pub deleted_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deleted_by: String,
}

impl Tombstone {
    /// Creates a tombstone for the given issue id, stamped now.
    pub fn new(id: impl Into<String>, deleted_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            deleted_at: Utc::now(),
            deleted_by: deleted_by.into(),
        }
    }

    /// Returns `true` if the tombstone's TTL has elapsed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_days: i64) -> bool {
        now - self.deleted_at > Duration::days(ttl_days)
    }

    /// Renders the tombstone as a journal record.
    pub fn to_journal_record(&self) -> Issue {
        let mut rec = Issue::default();
        rec.id = self.id.clone();
        rec.tombstone = true;
        rec.deleted_at = Some(self.deleted_at);
        rec.deleted_by = self.deleted_by.clone();
        // A tombstone's updated_at is its deletion time, so LWW comparisons
        // against live records are meaningful.
        rec.created_at = self.deleted_at;
        rec.updated_at = self.deleted_at;
        rec
    }

    /// Extracts a tombstone from a journal record, if it marks a deletion.
    pub fn from_journal_record(rec: &Issue) -> Option<Self> {
        if !rec.tombstone {
            return None;
        }
        Some(Self {
            id: rec.id.clone(),
            deleted_at: rec.deleted_at.unwrap_or(rec.updated_at),
            deleted_by: rec.deleted_by.clone(),
        })
    }
}
