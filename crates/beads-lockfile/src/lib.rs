//! Advisory file locking for the beads system.
//!
//! Wraps `fs2` OS-level locks behind a small RAII type. The sync engine
//! uses this to ensure at most one sync runs per workspace; acquisition is
//! non-blocking so a second sync fails fast instead of queueing.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors that can occur when acquiring a lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds the lock.
    #[error("lock at {path} is held by another process")]
    WouldBlock {
        /// Path of the contended lock file.
        path: PathBuf,
    },

    /// The lock file could not be created or opened.
    #[error("failed to open lock file: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

/// An exclusively-held advisory file lock.
///
/// The lock is released when the guard is dropped. The lock file itself is
/// left in place; only the OS-level lock is released.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Attempts to acquire an exclusive lock without blocking.
    ///
    /// Returns [`LockError::WouldBlock`] immediately if another process
    /// holds the lock.
    pub fn try_exclusive(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file, path }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::WouldBlock { path })
            }
            Err(e) => Err(LockError::Io(e)),
        }
    }

    /// The path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".sync.lock");

        let lock = LockFile::try_exclusive(&path).unwrap();
        assert_eq!(lock.path(), path);
        drop(lock);

        // Re-acquire after release.
        let _lock = LockFile::try_exclusive(&path).unwrap();
    }

    #[test]
    fn second_acquire_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".sync.lock");

        let _held = LockFile::try_exclusive(&path).unwrap();
        let err = LockFile::try_exclusive(&path).unwrap_err();
        assert!(matches!(err, LockError::WouldBlock { .. }));
    }

    #[test]
    fn lock_file_persists_after_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".sync.lock");

        drop(LockFile::try_exclusive(&path).unwrap());
        assert!(path.exists());
    }
}
