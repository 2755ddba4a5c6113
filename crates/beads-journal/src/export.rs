//! Journal export: incremental and full.
//!
//! Incremental export rewrites only the lines whose ids are dirty,
//! preserving every other line byte-for-byte and in its original order;
//! new ids are appended sorted. Full export rewrites the whole journal
//! from a store snapshot in stable id order. Both paths replace the file
//! atomically (sibling temp file, fsync, rename) so readers never observe
//! a partial write.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

use tracing::debug;

use beads_core::tombstone::Tombstone;
use beads_store::{META_EXPORT_HASHES, META_JOURNAL_HASH, Storage};

use crate::Result;
use crate::codec::{self, JournalError};

/// Result of an export pass.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Ids whose lines were written or removed.
    pub exported: Vec<String>,
    /// Whether the whole journal was rewritten.
    pub full: bool,
}

/// Rewrites the whole journal from the current store snapshot.
pub fn full_export(store: &dyn Storage, journal_path: &Path) -> Result<ExportReport> {
    // Claim the dirty set up front: mutations committing while we write
    // re-insert their rows and stay pending for the next flush.
    let claimed = store.take_dirty()?;
    match full_export_inner(store, journal_path) {
        Ok(report) => Ok(report),
        Err(e) => {
            restore_claim(store, &claimed);
            Err(e)
        }
    }
}

fn full_export_inner(store: &dyn Storage, journal_path: &Path) -> Result<ExportReport> {
    let issues = store.snapshot()?;
    let tombstones = store.get_tombstones()?;

    let mut records: Vec<beads_core::issue::Issue> = issues;
    records.extend(tombstones.iter().map(Tombstone::to_journal_record));
    records.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hashes: BTreeMap<String, String> = BTreeMap::new();
    let mut contents = String::new();
    for record in &records {
        let line = codec::canonical_line(record)?;
        hashes.insert(record.id.clone(), codec::line_hash(&line));
        contents.push_str(&line);
        contents.push('\n');
    }

    write_atomic(journal_path, &contents)?;

    store.set_metadata(META_EXPORT_HASHES, &serde_json::to_string(&hashes).map_err(io_json)?)?;
    store.set_metadata(META_JOURNAL_HASH, &codec::journal_hash(&contents))?;

    debug!(records = records.len(), "full journal export");
    Ok(ExportReport {
        exported: records.into_iter().map(|r| r.id).collect(),
        full: true,
    })
}

/// Rewrites only the dirty ids' lines, preserving the rest of the journal
/// in its original order. Ids that no longer exist (purged tombstones)
/// drop out of the file.
pub fn incremental_export(store: &dyn Storage, journal_path: &Path) -> Result<ExportReport> {
    let dirty = store.take_dirty()?;
    if dirty.is_empty() {
        return Ok(ExportReport::default());
    }
    match incremental_export_inner(store, journal_path, &dirty) {
        Ok(report) => Ok(report),
        Err(e) => {
            restore_claim(store, &dirty);
            Err(e)
        }
    }
}

fn incremental_export_inner(
    store: &dyn Storage,
    journal_path: &Path,
    dirty: &[String],
) -> Result<ExportReport> {
    let existing = if journal_path.exists() {
        std::fs::read_to_string(journal_path)?
    } else {
        String::new()
    };
    if let Some(line) = codec::find_conflict_marker(&existing) {
        return Err(JournalError::ConflictMarkers { line });
    }

    // Fresh serialization (or removal) for each dirty id.
    let tombstones: HashMap<String, Tombstone> = store
        .get_tombstones()?
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();

    let mut replacements: HashMap<String, Option<String>> = HashMap::new();
    for id in dirty {
        let line = if let Some(tombstone) = tombstones.get(id) {
            Some(codec::canonical_line(&tombstone.to_journal_record())?)
        } else {
            match store.get_issue_hydrated(id) {
                Ok(issue) => Some(codec::canonical_line(&issue)?),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e.into()),
            }
        };
        replacements.insert(id.clone(), line);
    }

    // Merge: replace in place, preserve everything else verbatim.
    let mut contents = String::new();
    let mut seen: Vec<String> = Vec::new();
    for line in existing.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            contents.push_str(line);
            contents.push('\n');
            continue;
        }
        match codec::line_id(trimmed) {
            Some(id) if replacements.contains_key(&id) => {
                if let Some(Some(new_line)) = replacements.get(&id) {
                    contents.push_str(new_line);
                    contents.push('\n');
                }
                // A None replacement drops the line entirely.
                seen.push(id);
            }
            _ => {
                contents.push_str(line);
                contents.push('\n');
            }
        }
    }

    // Append fresh ids not present in the journal, in id order.
    let mut appended: Vec<&String> = dirty
        .iter()
        .filter(|id| !seen.contains(*id))
        .collect();
    appended.sort();
    for id in appended {
        if let Some(Some(new_line)) = replacements.get(id) {
            contents.push_str(new_line);
            contents.push('\n');
        }
    }

    write_atomic(journal_path, &contents)?;

    // Update per-issue export hashes and the journal hash.
    let mut hashes: BTreeMap<String, String> = store
        .get_metadata(META_EXPORT_HASHES)?
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    for (id, line) in &replacements {
        match line {
            Some(line) => {
                hashes.insert(id.clone(), codec::line_hash(line));
            }
            None => {
                hashes.remove(id);
            }
        }
    }
    store.set_metadata(META_EXPORT_HASHES, &serde_json::to_string(&hashes).map_err(io_json)?)?;
    store.set_metadata(META_JOURNAL_HASH, &codec::journal_hash(&contents))?;

    debug!(count = dirty.len(), "incremental journal export");
    Ok(ExportReport {
        exported: dirty.to_vec(),
        full: false,
    })
}

/// Puts a claimed dirty set back after a failed export so nothing is
/// lost; the next flush retries it.
fn restore_claim(store: &dyn Storage, claimed: &[String]) {
    for id in claimed {
        let _ = store.mark_dirty(id);
    }
}

/// Writes contents to a sibling temp file, fsyncs, and renames over the
/// target. Readers either see the old journal or the new one, never a
/// torn write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| JournalError::Io(e.error))?;
    Ok(())
}

fn io_json(e: serde_json::Error) -> JournalError {
    JournalError::Json { line: 0, source: e }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;
    use beads_store::SqliteStore;
    use pretty_assertions::assert_eq;

    fn setup() -> (SqliteStore, tempfile::TempDir) {
        (SqliteStore::open_in_memory().unwrap(), tempfile::tempdir().unwrap())
    }

    #[test]
    fn full_export_is_sorted_and_deterministic() {
        let (store, dir) = setup();
        let path = dir.path().join("issues.jsonl");

        let b = IssueBuilder::new("B").id("bd-b").build();
        let a = IssueBuilder::new("A").id("bd-a").build();
        store.create_issue(&b, "t").unwrap();
        store.create_issue(&a, "t").unwrap();

        full_export(&store, &path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        let ids: Vec<Option<String>> = first.lines().map(codec::line_id).collect();
        assert_eq!(
            ids,
            vec![Some("bd-a".to_string()), Some("bd-b".to_string())]
        );

        // Exporting again yields identical bytes.
        full_export(&store, &path).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn full_export_records_hashes_and_clears_dirty() {
        let (store, dir) = setup();
        let path = dir.path().join("issues.jsonl");

        let x = IssueBuilder::new("X").id("bd-x").build();
        store.create_issue(&x, "t").unwrap();
        assert!(!store.dirty_ids().unwrap().is_empty());

        full_export(&store, &path).unwrap();
        assert!(store.dirty_ids().unwrap().is_empty());

        // export_hashes[X] equals the hash of X's current serialization.
        let hydrated = store.get_issue_hydrated("bd-x").unwrap();
        let expected = codec::line_hash(&codec::canonical_line(&hydrated).unwrap());
        let raw = store.get_metadata(META_EXPORT_HASHES).unwrap().unwrap();
        let hashes: std::collections::BTreeMap<String, String> =
            serde_json::from_str(&raw).unwrap();
        assert_eq!(hashes.get("bd-x"), Some(&expected));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            store.get_metadata(META_JOURNAL_HASH).unwrap().unwrap(),
            codec::journal_hash(&contents)
        );
    }

    #[test]
    fn incremental_export_replaces_in_place() {
        let (store, dir) = setup();
        let path = dir.path().join("issues.jsonl");

        let a = IssueBuilder::new("A").id("bd-a").build();
        let b = IssueBuilder::new("B").id("bd-b").build();
        store.create_issue(&a, "t").unwrap();
        store.create_issue(&b, "t").unwrap();
        full_export(&store, &path).unwrap();

        // Touch only A; B's line must be byte-identical and in place.
        let before: Vec<String> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect();
        store
            .update_issue(
                "bd-a",
                &beads_store::IssueUpdates {
                    title: Some("A2".into()),
                    ..Default::default()
                },
                "t",
            )
            .unwrap();

        let report = incremental_export(&store, &path).unwrap();
        assert!(!report.full);
        assert_eq!(report.exported, vec!["bd-a"]);

        let after: Vec<String> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect();
        assert_eq!(after.len(), 2);
        assert!(after[0].contains("\"A2\""));
        assert_eq!(after[1], before[1]);
    }

    #[test]
    fn incremental_export_appends_new_ids_sorted() {
        let (store, dir) = setup();
        let path = dir.path().join("issues.jsonl");

        let m = IssueBuilder::new("M").id("bd-m").build();
        store.create_issue(&m, "t").unwrap();
        full_export(&store, &path).unwrap();

        let z = IssueBuilder::new("Z").id("bd-z").build();
        let a = IssueBuilder::new("A").id("bd-a").build();
        store.create_issue(&z, "t").unwrap();
        store.create_issue(&a, "t").unwrap();
        incremental_export(&store, &path).unwrap();

        let ids: Vec<Option<String>> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(codec::line_id)
            .collect();
        // Existing line first, then new ids in sorted order.
        assert_eq!(
            ids,
            vec![
                Some("bd-m".to_string()),
                Some("bd-a".to_string()),
                Some("bd-z".to_string())
            ]
        );
    }

    #[test]
    fn incremental_export_writes_tombstone_line() {
        let (store, dir) = setup();
        let path = dir.path().join("issues.jsonl");

        let a = IssueBuilder::new("A").id("bd-a").build();
        store.create_issue(&a, "t").unwrap();
        full_export(&store, &path).unwrap();

        store.delete_issue("bd-a", "alice").unwrap();
        incremental_export(&store, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"tombstone\":true"));
        assert!(contents.contains("\"deleted_by\":\"alice\""));
    }

    #[test]
    fn incremental_export_preserves_comment_lines() {
        let (store, dir) = setup();
        let path = dir.path().join("issues.jsonl");
        std::fs::write(&path, "# managed by bd\n").unwrap();

        let a = IssueBuilder::new("A").id("bd-a").build();
        store.create_issue(&a, "t").unwrap();
        incremental_export(&store, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# managed by bd\n"));
    }

    #[test]
    fn incremental_export_refuses_conflicted_journal() {
        let (store, dir) = setup();
        let path = dir.path().join("issues.jsonl");
        std::fs::write(&path, "<<<<<<< HEAD\n").unwrap();

        let a = IssueBuilder::new("A").id("bd-a").build();
        store.create_issue(&a, "t").unwrap();

        let err = incremental_export(&store, &path).unwrap_err();
        assert!(matches!(err, JournalError::ConflictMarkers { line: 1 }));

        // The failed export put its claim back; nothing was lost.
        assert_eq!(store.dirty_ids().unwrap(), vec!["bd-a"]);
    }

    #[test]
    fn no_dirty_ids_is_a_noop() {
        let (store, dir) = setup();
        let path = dir.path().join("issues.jsonl");
        let report = incremental_export(&store, &path).unwrap();
        assert!(report.exported.is_empty());
        assert!(!path.exists());
    }
}
