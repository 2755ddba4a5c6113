//! Canonical JSONL journal codec and flush coordinator.
//!
//! The journal (`issues.jsonl`) is the git-tracked, append-friendly text
//! file that machines transport. [`codec`] defines the canonical line
//! format, [`export`] and [`import`] move data between the store and the
//! file, and [`flush`] owns the debounced write path.

pub mod codec;
pub mod export;
pub mod flush;
pub mod import;

pub use codec::JournalError;
pub use flush::{FlushCoordinator, FlushError};

/// Convenience alias used throughout the journal crate.
pub type Result<T> = std::result::Result<T, JournalError>;
