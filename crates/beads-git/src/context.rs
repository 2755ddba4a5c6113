//! Repository context resolution.
//!
//! [`RepoContext`] is the single source of truth for which repository,
//! worktree, and journal an operation acts on. It is resolved once per CLI
//! invocation (CWD and environment do not change mid-command); long-lived
//! callers must request a fresh context per logical operation via
//! [`RepoContext::for_workspace`] instead of caching.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::commands::{GitError, GitInvocation, git_command};

/// Environment variable overriding the `.beads/` directory.
pub const BEADS_DIR_ENV: &str = "BEADS_DIR";

/// Legacy environment variable pointing directly at a database file.
pub const BEADS_DB_ENV: &str = "BEADS_DB";

/// The name of the beads metadata directory.
const BEADS_DIR_NAME: &str = ".beads";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while resolving a repository context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No `.beads/` directory was found.
    #[error("no .beads directory found (run 'bd init' first)")]
    NoBeads,

    /// `BEADS_DIR` pointed at a system or other-user path.
    #[error("refusing unsafe BEADS_DIR path: {0}")]
    UnsafePath(PathBuf),

    /// A worktree `.git` file exists but its repository could not be
    /// resolved.
    #[error("worktree at {0} is detached from its repository")]
    WorktreeDetached(PathBuf),

    /// A git invocation failed during resolution.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Filesystem access failed during resolution.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;

// ---------------------------------------------------------------------------
// RepoContext
// ---------------------------------------------------------------------------

/// Resolved repository context for one invocation.
#[derive(Debug, Clone)]
pub struct RepoContext {
    /// The `.beads/` directory holding the journal and local state.
    pub beads_dir: PathBuf,

    /// Root of the repository containing `beads_dir`.
    pub repo_root: PathBuf,

    /// Root of the repository containing the caller's CWD, if any. May
    /// differ from `repo_root` under environment overrides.
    pub cwd_repo_root: Option<PathBuf>,

    /// `true` when the context points at a repository other than the
    /// caller's own.
    pub is_redirected: bool,

    /// `true` when `repo_root` is a linked git worktree.
    pub is_worktree: bool,

    /// Deadline applied to every git subprocess built from this context.
    pub git_timeout: Duration,
}

impl RepoContext {
    /// Resolves the context from the current working directory and
    /// environment.
    pub fn resolve() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve_from(&cwd)
    }

    /// Resolves the context from an explicit working directory, honoring
    /// `BEADS_DIR` / `BEADS_DB` overrides.
    pub fn resolve_from(cwd: &Path) -> Result<Self> {
        let env_dir = std::env::var(BEADS_DIR_ENV).ok();
        let env_db = std::env::var(BEADS_DB_ENV).ok();
        Self::resolve_with(cwd, env_dir.as_deref(), env_db.as_deref())
    }

    /// Resolves a context for an explicit workspace path, ignoring all
    /// environment overrides. Long-lived callers use this per operation;
    /// the result must not be cached.
    pub fn for_workspace(path: &Path) -> Result<Self> {
        Self::resolve_with(path, None, None)
    }

    fn resolve_with(
        cwd: &Path,
        env_beads_dir: Option<&str>,
        env_beads_db: Option<&str>,
    ) -> Result<Self> {
        // 1. BEADS_DIR override, subject to the safety check.
        let beads_dir = if let Some(dir) = env_beads_dir.filter(|d| !d.is_empty()) {
            let path = PathBuf::from(dir);
            let canonical = path.canonicalize().unwrap_or(path);
            if is_unsafe_path(&canonical) {
                return Err(ContextError::UnsafePath(canonical));
            }
            if !canonical.is_dir() {
                return Err(ContextError::NoBeads);
            }
            canonical
        } else if let Some(found) = walk_up_for_beads(cwd) {
            // 2. Upward walk from CWD.
            found
        } else if let Some(db) = env_beads_db.filter(|d| !d.is_empty()) {
            // Legacy fallback: BEADS_DB points at a database file inside
            // the beads directory.
            let parent = Path::new(db)
                .parent()
                .map(Path::to_path_buf)
                .ok_or(ContextError::NoBeads)?;
            if !parent.is_dir() {
                return Err(ContextError::NoBeads);
            }
            parent
        } else {
            return Err(ContextError::NoBeads);
        };

        // 3. Repository containing beads_dir.
        let holder = beads_dir.parent().unwrap_or(&beads_dir).to_path_buf();
        let repo_root = git_toplevel(&holder)?.ok_or(GitError::NotARepo(holder.clone()))?;
        let is_worktree = detect_worktree(&repo_root)?;

        // 4. The caller's own repository, resolved independently.
        let cwd_repo_root = git_toplevel(cwd).unwrap_or(None);
        let is_redirected = cwd_repo_root.as_deref() != Some(repo_root.as_path());

        debug!(
            beads_dir = %beads_dir.display(),
            repo_root = %repo_root.display(),
            is_worktree,
            is_redirected,
            "resolved repo context"
        );

        Ok(Self {
            beads_dir,
            repo_root,
            cwd_repo_root,
            is_redirected,
            is_worktree,
            git_timeout: crate::commands::DEFAULT_TIMEOUT,
        })
    }

    /// Builds a git invocation bound to `repo_root`.
    pub fn git_cmd(&self, args: &[&str]) -> GitInvocation {
        GitInvocation::new(&self.repo_root, args).timeout(self.git_timeout)
    }

    /// Builds a git invocation bound to the caller's own repository.
    pub fn git_cmd_cwd(&self, args: &[&str]) -> Result<GitInvocation> {
        let root = self.cwd_repo_root.as_ref().ok_or_else(|| {
            ContextError::Git(GitError::NotARepo(PathBuf::from(".")))
        })?;
        Ok(GitInvocation::new(root, args).timeout(self.git_timeout))
    }

    /// Converts an absolute path to a repo-relative display path.
    pub fn rel_path<'a>(&self, abs: &'a Path) -> &'a Path {
        abs.strip_prefix(&self.repo_root).unwrap_or(abs)
    }

    /// Re-checks that the resolved directories still exist. Long-lived
    /// callers run this before reusing a context.
    pub fn validate(&self) -> Result<()> {
        if !self.beads_dir.is_dir() {
            return Err(ContextError::NoBeads);
        }
        if !self.repo_root.is_dir() {
            return Err(ContextError::Git(GitError::NotARepo(
                self.repo_root.clone(),
            )));
        }
        Ok(())
    }

    /// Path of the journal file.
    pub fn journal_path(&self) -> PathBuf {
        self.beads_dir.join("issues.jsonl")
    }

    /// Path of the per-clone merge base snapshot.
    pub fn base_path(&self) -> PathBuf {
        self.beads_dir.join("sync_base.jsonl")
    }

    /// Path of the sync lock file.
    pub fn sync_lock_path(&self) -> PathBuf {
        self.beads_dir.join(".sync.lock")
    }

    /// Path of the embedded database.
    pub fn db_path(&self) -> PathBuf {
        self.beads_dir.join("beads.db")
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn walk_up_for_beads(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    let mut current = start.as_path();
    loop {
        let candidate = current.join(BEADS_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent,
            _ => return None,
        }
    }
}

/// Asks git for the repository toplevel containing `dir`, or `None` when
/// outside any repository.
fn git_toplevel(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    match git_command(&["rev-parse", "--show-toplevel"], dir) {
        Ok(out) => Ok(Some(PathBuf::from(out))),
        Err(GitError::CommandFailed { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Detects whether `repo_root` is a linked worktree by comparing the git
/// dir with the common dir, following `.git`-file indirection.
fn detect_worktree(repo_root: &Path) -> Result<bool> {
    let dot_git = repo_root.join(".git");
    if dot_git.is_dir() {
        return Ok(false);
    }
    if !dot_git.is_file() {
        return Ok(false);
    }

    // `.git` is a file: this is a worktree (or submodule). Resolve both
    // dirs; failure here means the backing repository is gone.
    let git_dir = git_command(&["rev-parse", "--git-dir"], repo_root)
        .map_err(|_| ContextError::WorktreeDetached(repo_root.to_path_buf()))?;
    let common_dir = git_command(&["rev-parse", "--git-common-dir"], repo_root)
        .map_err(|_| ContextError::WorktreeDetached(repo_root.to_path_buf()))?;

    let abs_git = absolutize(repo_root, &git_dir);
    let abs_common = absolutize(repo_root, &common_dir);
    Ok(abs_git != abs_common)
}

fn absolutize(base: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    joined.canonicalize().unwrap_or(joined)
}

/// Rejects system paths and other users' home directories as `BEADS_DIR`
/// targets.
fn is_unsafe_path(p: &Path) -> bool {
    const FORBIDDEN: &[&str] = &[
        "/etc", "/usr", "/bin", "/sbin", "/lib", "/lib64", "/boot", "/proc", "/sys", "/dev",
    ];
    if p == Path::new("/") {
        return true;
    }
    if FORBIDDEN.iter().any(|f| p.starts_with(f)) {
        return true;
    }
    // Another user's home directory.
    if let Ok(rel) = p.strip_prefix("/home") {
        if let Some(user) = rel.components().next() {
            if let Ok(me) = std::env::var("USER") {
                if user.as_os_str() != std::ffi::OsStr::new(&me) {
                    return true;
                }
            }
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Creates a temp git repo with a `.beads/` directory.
    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        git_command(&["init", "-q"], &root).unwrap();
        std::fs::create_dir(root.join(".beads")).unwrap();
        (dir, root)
    }

    #[test]
    fn resolves_from_repo_root() {
        let (_dir, root) = fixture();
        let ctx = RepoContext::resolve_with(&root, None, None).unwrap();
        assert_eq!(ctx.beads_dir, root.join(".beads"));
        assert_eq!(ctx.repo_root.canonicalize().unwrap(), root);
        assert!(!ctx.is_worktree);
        assert!(!ctx.is_redirected);
    }

    #[test]
    fn resolves_from_nested_dir() {
        let (_dir, root) = fixture();
        let nested = root.join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = RepoContext::resolve_with(&nested, None, None).unwrap();
        assert_eq!(ctx.beads_dir, root.join(".beads"));
    }

    #[test]
    fn no_beads_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        git_command(&["init", "-q"], dir.path()).unwrap();
        let err = RepoContext::resolve_with(dir.path(), None, None).unwrap_err();
        assert!(matches!(err, ContextError::NoBeads));
    }

    #[test]
    fn env_override_redirects() {
        let (_a, root_a) = fixture();
        let (_b, root_b) = fixture();

        let beads_a = root_a.join(".beads");
        let ctx =
            RepoContext::resolve_with(&root_b, Some(beads_a.to_str().unwrap()), None).unwrap();
        assert_eq!(ctx.beads_dir, beads_a);
        assert_eq!(ctx.repo_root.canonicalize().unwrap(), root_a);
        assert!(ctx.is_redirected);
        assert_eq!(
            ctx.cwd_repo_root.unwrap().canonicalize().unwrap(),
            root_b
        );
    }

    #[test]
    fn unsafe_env_path_rejected() {
        let (_dir, root) = fixture();
        let err = RepoContext::resolve_with(&root, Some("/etc"), None).unwrap_err();
        assert!(matches!(err, ContextError::UnsafePath(_)));
    }

    #[test]
    fn worktree_is_detected() {
        let (_dir, root) = fixture();
        git_command(&["config", "user.email", "t@example.com"], &root).unwrap();
        git_command(&["config", "user.name", "t"], &root).unwrap();
        std::fs::write(root.join("f.txt"), "x").unwrap();
        git_command(&["add", "."], &root).unwrap();
        git_command(&["commit", "-q", "-m", "init"], &root).unwrap();

        let wt = root.join("wt");
        git_command(&["worktree", "add", "-q", wt.to_str().unwrap()], &root).unwrap();
        std::fs::create_dir(wt.join(".beads")).unwrap();

        let ctx = RepoContext::resolve_with(&wt, None, None).unwrap();
        assert!(ctx.is_worktree);
        assert_eq!(ctx.repo_root.canonicalize().unwrap(), wt.canonicalize().unwrap());
    }

    #[test]
    fn for_workspace_ignores_env() {
        let (_dir, root) = fixture();
        // for_workspace never consults BEADS_DIR, so no env juggling needed:
        // resolve_with(None, None) is its exact behavior.
        let ctx = RepoContext::for_workspace(&root).unwrap();
        assert_eq!(ctx.beads_dir, root.join(".beads"));
    }

    #[test]
    fn validate_detects_removal() {
        let (_dir, root) = fixture();
        let ctx = RepoContext::resolve_with(&root, None, None).unwrap();
        ctx.validate().unwrap();

        std::fs::remove_dir_all(root.join(".beads")).unwrap();
        assert!(matches!(ctx.validate().unwrap_err(), ContextError::NoBeads));
    }

    #[test]
    fn rel_path_strips_root() {
        let (_dir, root) = fixture();
        let ctx = RepoContext::resolve_with(&root, None, None).unwrap();
        let abs = ctx.repo_root.join(".beads").join("issues.jsonl");
        assert_eq!(
            ctx.rel_path(&abs),
            Path::new(".beads/issues.jsonl")
        );
    }

    #[test]
    fn unsafe_path_rules() {
        assert!(is_unsafe_path(Path::new("/")));
        assert!(is_unsafe_path(Path::new("/etc")));
        assert!(is_unsafe_path(Path::new("/usr/share/x")));
        assert!(!is_unsafe_path(Path::new("/tmp/work/.beads")));
    }
}
