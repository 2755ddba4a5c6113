//! Pull-first 3-way sync engine.
//!
//! Reconciles three states on every sync: the local store, the per-clone
//! base snapshot (the journal as of the last successful sync), and the
//! remote journal after `git pull`. The merge is field-aware and never
//! silently loses data; truly conflicting outcomes are reported as
//! events for human review.

pub mod base;
pub mod engine;
pub mod merge;

pub use engine::{SyncEngine, SyncOptions, SyncReport};
pub use merge::{Entry, MergeEvent, MergeOptions, Snapshot};

use thiserror::Error;

/// Errors that can occur during a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another sync holds the workspace lock.
    #[error("another sync is already in progress")]
    SyncInProgress,

    /// `git pull` left conflict markers in the journal.
    #[error("journal has unresolved merge conflicts (first marker at line {line}); resolve and retry")]
    UnresolvedJournalConflict {
        /// 1-based line of the first marker.
        line: usize,
    },

    /// A git operation failed after retries.
    #[error(transparent)]
    Git(#[from] beads_git::GitError),

    /// Journal encode/decode failed.
    #[error(transparent)]
    Journal(#[from] beads_journal::JournalError),

    /// A store operation failed.
    #[error(transparent)]
    Storage(#[from] beads_store::StorageError),

    /// Lock file I/O failed.
    #[error("lock error: {0}")]
    Lock(String),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the sync crate.
pub type Result<T> = std::result::Result<T, SyncError>;
