//! Per-clone merge base snapshot.
//!
//! `sync_base.jsonl` records the journal content as of the last
//! successful sync. It is local state (git-ignored) and never transported
//! between clones; each clone's base reflects what *it* last reconciled.

use std::path::Path;

use beads_journal::codec;
use beads_journal::export::write_atomic;

use crate::Result;
use crate::merge::{Snapshot, snapshot_from_records};

/// Reads the base snapshot. A missing file is an empty base (first sync).
pub fn read_base(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Ok(Snapshot::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let records = codec::parse_journal(&contents)?;
    Ok(snapshot_from_records(records))
}

/// Atomically replaces the base snapshot with the given journal bytes.
pub fn write_base(path: &Path, journal_contents: &str) -> Result<()> {
    write_atomic(path, journal_contents)?;
    Ok(())
}
