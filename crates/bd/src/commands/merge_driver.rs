//! `bd merge-driver` -- git merge driver for the journal file.
//!
//! Invoked by git as `bd merge-driver %A %O %B` when both sides of a git
//! merge touched `issues.jsonl`. Runs the same 3-way, field-aware merge
//! as sync and writes the result over the current version (%A). The
//! merge is total, so git never sees conflict markers in the journal
//! when the driver is installed.

use std::path::Path;

use anyhow::{Context, Result};

use beads_journal::codec;
use beads_journal::export::write_atomic;
use beads_sync::merge::{Entry, MergeOptions, merge3, snapshot_from_records};

use crate::cli::MergeDriverArgs;

/// Execute the `bd merge-driver` command. Runs without a store: it only
/// sees the three journal versions git hands it.
pub fn run(args: &MergeDriverArgs) -> Result<()> {
    let ours = read_snapshot(&args.current)?;
    let base = read_snapshot(&args.ancestor)?;
    let theirs = read_snapshot(&args.other)?;

    let outcome = merge3(&base, &ours, &theirs, &MergeOptions::default());

    let mut records: Vec<beads_core::issue::Issue> = outcome
        .merged
        .into_values()
        .map(|entry| match entry {
            Entry::Live(issue) => issue,
            Entry::Dead(tombstone) => tombstone.to_journal_record(),
        })
        .collect();
    records.sort_by(|a, b| a.id.cmp(&b.id));

    let contents = codec::render_journal(&records)?;
    write_atomic(Path::new(&args.current), &contents)?;
    Ok(())
}

fn read_snapshot(path: &str) -> Result<beads_sync::Snapshot> {
    let path = Path::new(path);
    let contents = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    } else {
        String::new()
    };
    let records = codec::parse_journal(&contents)?;
    Ok(snapshot_from_records(records))
}
