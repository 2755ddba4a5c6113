//! The pull-first sync pipeline.
//!
//! Order matters: pull before export, so edits that arrived while we were
//! offline participate in the merge instead of being clobbered. Any error
//! before the merged import leaves the store untouched; any error after
//! it leaves the store consistent with the base snapshot unadvanced, so
//! the next sync retries from a well-defined point.

use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::{debug, info, warn};

use beads_core::enums::EventType;
use beads_git::{GitError, RepoContext};
use beads_journal::codec;
use beads_journal::export;
use beads_lockfile::{LockError, LockFile};
use beads_store::Storage;

use crate::base::{read_base, write_base};
use crate::merge::{Entry, MergeEvent, MergeOptions, Snapshot, merge3, snapshot_from_records};
use crate::{Result, SyncError};

/// Git retry policy: bounded attempts with exponential backoff.
const GIT_RETRIES: u32 = 3;
const GIT_BACKOFF_BASE_MS: u64 = 200;

/// Options controlling a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Actor recorded on merge-produced events and the sync commit.
    pub actor: String,
    /// Days a tombstone stays authoritative.
    pub tombstone_ttl_days: i64,
    /// Hours of divergence before a clock-skew warning.
    pub clock_skew_warn_hours: i64,
    /// Skip `git push` (pull + merge + commit only).
    pub no_push: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            actor: "sync".into(),
            tombstone_ttl_days: beads_core::tombstone::DEFAULT_TTL_DAYS,
            clock_skew_warn_hours: 24,
            no_push: false,
        }
    }
}

/// What a sync run did.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Entities in the merged state.
    pub merged: usize,
    /// Issues whose modification won over a deletion.
    pub resurrected: Vec<String>,
    /// Blocking edges dropped to break merge-created cycles.
    pub cycles_resolved: usize,
    /// Clock-skew warnings emitted.
    pub skew_warnings: usize,
    /// Whether a push ran.
    pub pushed: bool,
}

/// One sync engine bound to a repository context and store.
pub struct SyncEngine<'a> {
    ctx: &'a RepoContext,
    store: &'a dyn Storage,
    opts: SyncOptions,
}

impl<'a> SyncEngine<'a> {
    pub fn new(ctx: &'a RepoContext, store: &'a dyn Storage, opts: SyncOptions) -> Self {
        Self { ctx, store, opts }
    }

    /// Runs one full sync cycle under the workspace sync lock.
    pub fn sync(&self) -> Result<SyncReport> {
        let _lock = match LockFile::try_exclusive(self.ctx.sync_lock_path()) {
            Ok(lock) => lock,
            Err(LockError::WouldBlock { .. }) => return Err(SyncError::SyncInProgress),
            Err(LockError::Io(e)) => return Err(SyncError::Lock(e.to_string())),
        };

        let journal_path = self.ctx.journal_path();

        // 1. Snapshot local state before anything moves.
        let local = self.snapshot_local()?;

        // 2. The per-clone merge base.
        let base = read_base(&self.ctx.base_path())?;

        // 3. Pull. Afterwards the journal must be marker-free.
        let has_remote = self.has_remote()?;
        if has_remote {
            self.pull()?;
        }
        let remote_contents = read_journal(&journal_path)?;
        if let Some(line) = codec::find_conflict_marker(&remote_contents) {
            return Err(SyncError::UnresolvedJournalConflict { line });
        }
        let remote = snapshot_from_records(codec::parse_journal(&remote_contents)?);

        // 4. 3-way merge.
        let merge_opts = MergeOptions {
            tombstone_ttl_days: self.opts.tombstone_ttl_days,
            clock_skew_warn: Duration::hours(self.opts.clock_skew_warn_hours),
        };
        let outcome = merge3(&base, &local, &remote, &merge_opts);

        let mut report = SyncReport {
            merged: outcome.merged.len(),
            ..Default::default()
        };
        for event in &outcome.events {
            match event {
                MergeEvent::Resurrected { id, .. } => report.resurrected.push(id.clone()),
                MergeEvent::CycleResolved { .. } => report.cycles_resolved += 1,
                MergeEvent::ClockSkewWarning { .. } => report.skew_warnings += 1,
            }
        }

        // 5. Apply the merged state in one transaction.
        self.apply_merged(&outcome.merged, &outcome.events)?;
        self.store
            .purge_expired_tombstones(self.opts.tombstone_ttl_days)?;

        // 6. Export the reconciled store and publish it.
        export::full_export(self.store, &journal_path)?;
        let new_contents = read_journal(&journal_path)?;

        if has_remote || self.journal_tracked()? {
            self.commit(&journal_path)?;
        }
        if has_remote && !self.opts.no_push {
            self.push()?;
            report.pushed = true;
        }

        // 7. Advance the base only after everything else succeeded.
        write_base(&self.ctx.base_path(), &new_contents)?;

        info!(
            merged = report.merged,
            resurrected = report.resurrected.len(),
            pushed = report.pushed,
            "sync complete"
        );
        Ok(report)
    }

    /// Builds the local snapshot: live issues plus tombstones.
    fn snapshot_local(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        for issue in self.store.snapshot()? {
            snapshot.insert(issue.id.clone(), Entry::Live(issue));
        }
        for tombstone in self.store.get_tombstones()? {
            snapshot.insert(tombstone.id.clone(), Entry::Dead(tombstone));
        }
        Ok(snapshot)
    }

    /// Writes the merged state into the store in a single transaction:
    /// upserts live entries, applies tombstones, drops rows absent from
    /// the merge, records merge events, and rebuilds the blocked cache.
    fn apply_merged(&self, merged: &Snapshot, events: &[MergeEvent]) -> Result<()> {
        let actor = self.opts.actor.clone();
        self.store.run_in_transaction(&|tx| {
            for id in tx.all_ids()? {
                if !matches!(merged.get(&id), Some(Entry::Live(_))) {
                    tx.delete_issue_row(&id)?;
                }
            }

            for (id, entry) in merged {
                match entry {
                    Entry::Live(issue) => {
                        tx.upsert_issue(issue, &actor)?;
                        tx.remove_tombstone(id)?;
                    }
                    Entry::Dead(tombstone) => {
                        tx.apply_tombstone(tombstone)?;
                    }
                }
            }

            for event in events {
                match event {
                    MergeEvent::Resurrected { id, deleter } => {
                        tx.record_event(id, &EventType::Resurrected, deleter, None, None)?;
                    }
                    MergeEvent::ClockSkewWarning { id, skew_hours } => {
                        tx.record_event(
                            id,
                            &EventType::ClockSkewWarning,
                            &actor,
                            None,
                            Some(&format!("{skew_hours}h")),
                        )?;
                    }
                    MergeEvent::CycleResolved {
                        issue_id,
                        depends_on_id,
                        kind,
                    } => {
                        tx.record_event(
                            issue_id,
                            &EventType::MergeCycleResolved,
                            &actor,
                            Some(&format!("{issue_id} -> {depends_on_id} ({kind})")),
                            None,
                        )?;
                    }
                }
            }

            tx.rebuild_blocked_cache()?;
            Ok(())
        })?;
        Ok(())
    }

    // -- Git plumbing --------------------------------------------------------

    fn has_remote(&self) -> Result<bool> {
        let out = self.ctx.git_cmd(&["remote"]).run()?;
        Ok(!out.is_empty())
    }

    fn journal_tracked(&self) -> Result<bool> {
        // True once the journal has been committed at least once.
        let rel = self.ctx.journal_path();
        let rel = self.ctx.rel_path(&rel).to_string_lossy().to_string();
        match self
            .ctx
            .git_cmd(&["ls-files", "--error-unmatch", &rel])
            .run()
        {
            Ok(_) => Ok(true),
            Err(GitError::CommandFailed { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn pull(&self) -> Result<()> {
        let result = self.with_retry("pull", || {
            self.ctx
                .git_cmd(&["pull", "--no-rebase", "--no-edit", "-q"])
                .run()
        });
        match result {
            Ok(_) => Ok(()),
            Err(GitError::CommandFailed { stderr, .. }) if is_no_upstream(&stderr) => {
                debug!("no upstream configured; skipping pull");
                Ok(())
            }
            Err(GitError::CommandFailed { stderr, .. }) => {
                // A merge conflict leaves markers in the journal; report
                // that precisely, anything else as a git failure.
                let journal = read_journal(&self.ctx.journal_path())?;
                if let Some(line) = codec::find_conflict_marker(&journal) {
                    Err(SyncError::UnresolvedJournalConflict { line })
                } else {
                    Err(SyncError::Git(GitError::CommandFailed {
                        args: "pull".into(),
                        code: None,
                        stderr,
                    }))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn commit(&self, journal_path: &Path) -> Result<()> {
        let rel = self.ctx.rel_path(journal_path).to_string_lossy().to_string();
        self.ctx.git_cmd(&["add", "--", &rel]).run()?;

        let staged = self
            .ctx
            .git_cmd(&["diff", "--cached", "--name-only", "--", &rel])
            .run()?;
        if staged.is_empty() {
            debug!("journal unchanged; nothing to commit");
            return Ok(());
        }

        let message = format!("bd: sync journal ({})", self.opts.actor);
        self.ctx
            .git_cmd(&["commit", "-q", "-m", &message, "--", &rel])
            .run()?;
        Ok(())
    }

    fn push(&self) -> Result<()> {
        let result = self.with_retry("push", || self.ctx.git_cmd(&["push", "-q"]).run());
        match result {
            Ok(_) => Ok(()),
            Err(GitError::CommandFailed { stderr, .. }) if is_no_upstream(&stderr) => {
                debug!("no upstream configured; skipping push");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Runs a git operation up to [`GIT_RETRIES`] times with exponential
    /// backoff and a little jitter, retrying only transient failures.
    fn with_retry<F>(&self, what: &str, mut f: F) -> std::result::Result<String, GitError>
    where
        F: FnMut() -> std::result::Result<String, GitError>,
    {
        let mut attempt = 0;
        loop {
            match f() {
                Ok(out) => return Ok(out),
                Err(e) if attempt + 1 < GIT_RETRIES && is_transient(&e) => {
                    attempt += 1;
                    let backoff = GIT_BACKOFF_BASE_MS * (1 << attempt) + jitter_ms();
                    warn!(what, attempt, backoff_ms = backoff, error = %e, "git retry");
                    std::thread::sleep(StdDuration::from_millis(backoff));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn read_journal(path: &Path) -> Result<String> {
    if path.exists() {
        Ok(std::fs::read_to_string(path)?)
    } else {
        Ok(String::new())
    }
}

fn is_no_upstream(stderr: &str) -> bool {
    stderr.contains("no tracking information")
        || stderr.contains("No configured push destination")
        || stderr.contains("couldn't find remote ref")
        || stderr.contains("does not appear to be a git repository")
}

fn is_transient(e: &GitError) -> bool {
    match e {
        GitError::Timeout { .. } => true,
        GitError::CommandFailed { stderr, .. } => {
            stderr.contains("Could not resolve host")
                || stderr.contains("unable to access")
                || stderr.contains("remote end hung up")
                || stderr.contains("cannot lock ref")
        }
        _ => false,
    }
}

fn jitter_ms() -> u64 {
    // Sub-millisecond clock bits are jitter enough for backoff spreading.
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()) % 100)
        .unwrap_or(0)
}
