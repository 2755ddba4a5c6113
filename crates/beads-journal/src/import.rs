//! Journal import.
//!
//! Parses the journal, validates every record, and upserts them into the
//! store within a single transaction, parents before children. Tombstone
//! records delete the matching live issue unless it was updated after the
//! deletion. Re-importing the current journal changes nothing but the
//! import metadata.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use tracing::info;

use beads_core::enums::DependencyType;
use beads_core::issue::Issue;
use beads_core::tombstone::Tombstone;
use beads_core::validation;
use beads_store::{META_LAST_IMPORT_HASH, META_LAST_IMPORT_TIME, Storage, StorageError};

use crate::Result;
use crate::codec;

/// Result of an import pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Records parsed from the journal.
    pub total: usize,
    /// Issues created or updated.
    pub changed: usize,
    /// Issues already identical in the store.
    pub unchanged: usize,
    /// Tombstones applied (live issue removed or marker recorded).
    pub deleted: usize,
}

/// Imports a journal file into the store.
pub fn import_file(store: &dyn Storage, journal_path: &Path) -> Result<ImportReport> {
    let contents = if journal_path.exists() {
        std::fs::read_to_string(journal_path)?
    } else {
        String::new()
    };
    let report = import_contents(store, &contents)?;
    info!(
        total = report.total,
        changed = report.changed,
        deleted = report.deleted,
        "journal import"
    );
    Ok(report)
}

/// Imports journal contents into the store within one transaction.
pub fn import_contents(store: &dyn Storage, contents: &str) -> Result<ImportReport> {
    let records = codec::parse_journal(contents)?;

    // Validate everything before touching the store.
    for record in &records {
        validation::validate_for_import(record).map_err(StorageError::from)?;
    }

    let ordered = order_parents_first(records);

    let mut report = ImportReport {
        total: ordered.len(),
        ..Default::default()
    };
    let hash = codec::journal_hash(contents);

    {
        let report = std::cell::RefCell::new(&mut report);
        store.run_in_transaction(&|tx| {
            for record in &ordered {
                if record.is_tombstone() {
                    let tombstone = Tombstone::from_journal_record(record)
                        .expect("tombstone flag checked above");
                    let applied = apply_tombstone(tx, &tombstone)?;
                    if applied {
                        report.borrow_mut().deleted += 1;
                    } else {
                        report.borrow_mut().unchanged += 1;
                    }
                } else if tx.upsert_issue(record, "import")? {
                    tx.mark_dirty(&record.id)?;
                    report.borrow_mut().changed += 1;
                } else {
                    report.borrow_mut().unchanged += 1;
                }
            }

            tx.rebuild_blocked_cache()?;
            tx.set_metadata(META_LAST_IMPORT_TIME, &Utc::now().to_rfc3339())?;
            tx.set_metadata(META_LAST_IMPORT_HASH, &hash)?;
            Ok(())
        })?;
    }

    Ok(report)
}

/// Applies a tombstone inside the import transaction. Returns `true` if
/// it removed a live issue or recorded a new marker.
fn apply_tombstone(
    tx: &dyn beads_store::Transaction,
    tombstone: &Tombstone,
) -> std::result::Result<bool, StorageError> {
    match tx.get_issue(&tombstone.id) {
        Ok(existing) => {
            if existing.updated_at > tombstone.deleted_at {
                // Local copy is newer than the deletion: keep it. The sync
                // engine decides resurrections; plain import never drops
                // newer data.
                Ok(false)
            } else {
                tx.delete_issue_row(&tombstone.id)?;
                tx.apply_tombstone(tombstone)?;
                tx.mark_dirty(&tombstone.id)?;
                Ok(true)
            }
        }
        Err(e) if e.is_not_found() => {
            tx.apply_tombstone(tombstone)?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Orders records so parent-child parents come before their children.
/// Unresolvable order (cross-batch parents, cycles in non-blocking kinds)
/// degrades to input order for the remainder.
fn order_parents_first(records: Vec<Issue>) -> Vec<Issue> {
    let in_batch: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
    let mut remaining: Vec<Issue> = records;
    let mut placed: HashSet<String> = HashSet::new();
    let mut ordered: Vec<Issue> = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut progressed = false;
        let mut still_waiting = Vec::new();

        for record in remaining {
            let parent_pending = record
                .dependencies
                .iter()
                .filter(|d| d.dep_type == DependencyType::ParentChild)
                .any(|d| in_batch.contains(&d.depends_on_id) && !placed.contains(&d.depends_on_id));
            if parent_pending {
                still_waiting.push(record);
            } else {
                placed.insert(record.id.clone());
                ordered.push(record);
                progressed = true;
            }
        }

        if !progressed {
            // No resolvable parent order left; take the rest as-is.
            ordered.extend(still_waiting);
            break;
        }
        remaining = still_waiting;
    }

    ordered
}
