//! Discovery and creation of the `.beads/` directory.
//!
//! The `.beads/` directory is the root of a workspace's metadata: the
//! journal, the per-clone sync base, lock files, and local config all live
//! under it. Environment overrides (`BEADS_DIR`) are handled one layer up
//! by the repo context resolver, which owns the path-safety check; this
//! module is the plain filesystem walk.

use crate::config::ConfigError;
use std::path::{Path, PathBuf};

/// The name of the beads metadata directory.
pub const BEADS_DIR_NAME: &str = ".beads";

/// Walk up the directory tree from `start` looking for a `.beads/`
/// directory.
///
/// Returns the path to the `.beads/` directory if found, or `None` if the
/// filesystem root is reached without finding one.
pub fn find_beads_dir(start: &Path) -> Option<PathBuf> {
    let start = match start.canonicalize() {
        Ok(p) => p,
        Err(_) => return None,
    };

    let mut current = start.as_path();
    loop {
        let candidate = current.join(BEADS_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent;
            }
            _ => break, // Reached filesystem root.
        }
    }

    None
}

/// Ensure a `.beads/` directory exists at the given path.
///
/// If `path` itself is not called `.beads`, a `.beads/` subdirectory is
/// created under it. Returns the path to the `.beads/` directory.
pub fn ensure_beads_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let beads_dir = if path.ends_with(BEADS_DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(BEADS_DIR_NAME)
    };

    std::fs::create_dir_all(&beads_dir)?;
    Ok(beads_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_beads_dir_in_temp() {
        let dir = tempfile::tempdir().unwrap();
        let beads = dir.path().join(".beads");
        std::fs::create_dir(&beads).unwrap();

        let found = find_beads_dir(dir.path()).unwrap();
        // Canonicalize both (handles /tmp vs /private/tmp symlinks).
        assert_eq!(
            found.canonicalize().unwrap(),
            beads.canonicalize().unwrap()
        );
    }

    #[test]
    fn find_beads_dir_from_nested_child() {
        let dir = tempfile::tempdir().unwrap();
        let beads = dir.path().join(".beads");
        std::fs::create_dir(&beads).unwrap();

        let child = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&child).unwrap();

        let found = find_beads_dir(&child).unwrap();
        assert_eq!(
            found.canonicalize().unwrap(),
            beads.canonicalize().unwrap()
        );
    }

    #[test]
    fn ensure_beads_dir_creates() {
        let dir = tempfile::tempdir().unwrap();
        let result = ensure_beads_dir(dir.path()).unwrap();
        assert!(result.is_dir());
        assert!(result.ends_with(".beads"));
    }

    #[test]
    fn ensure_beads_dir_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let result1 = ensure_beads_dir(dir.path()).unwrap();
        let result2 = ensure_beads_dir(dir.path()).unwrap();
        assert_eq!(result1, result2);
    }
}
