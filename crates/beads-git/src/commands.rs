//! Git command execution.
//!
//! All git subprocesses run with hooks and templates disabled so that a
//! hostile repository reachable via `BEADS_DIR` cannot execute scripts,
//! and with a deadline after which the process is killed. The working
//! directory is always set explicitly; `-C` flags are never passed.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default timeout for git subprocesses.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while waiting for a git subprocess.
const WAIT_POLL: Duration = Duration::from_millis(25);

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when running git commands.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary could not be found or spawned.
    #[error("failed to execute git: {0}")]
    SpawnError(#[from] std::io::Error),

    /// The git command exited with a non-zero status.
    #[error("git {args} failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        /// The subcommand and arguments, space-joined.
        args: String,
        /// The exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
        /// The content of stderr.
        stderr: String,
    },

    /// The git command exceeded its deadline and was killed.
    #[error("git {args} timed out after {secs}s")]
    Timeout {
        /// The subcommand and arguments, space-joined.
        args: String,
        /// The timeout in seconds.
        secs: u64,
    },

    /// Not inside a git repository.
    #[error("not a git repository: {0}")]
    NotARepo(PathBuf),
}

/// A specialized `Result` type for git operations.
pub type Result<T> = std::result::Result<T, GitError>;

// ---------------------------------------------------------------------------
// Invocation builder
// ---------------------------------------------------------------------------

/// A prepared git invocation bound to a working directory.
///
/// Built by [`RepoContext::git_cmd`](crate::context::RepoContext::git_cmd)
/// so that callers cannot accidentally run git against the wrong
/// repository.
#[derive(Debug)]
pub struct GitInvocation {
    cwd: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl GitInvocation {
    /// Creates an invocation with the default timeout.
    pub fn new(cwd: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            cwd: cwd.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the subprocess deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the command, returning trimmed stdout on success.
    pub fn run(&self) -> Result<String> {
        let args_display = self.args.join(" ");
        tracing::debug!(cwd = %self.cwd.display(), args = %args_display, "running git");

        let mut child = Command::new("git")
            .args(&self.args)
            .current_dir(&self.cwd)
            // Disable hooks and templates: a repository reached through an
            // environment override must not get code execution.
            .env("GIT_CONFIG_COUNT", "2")
            .env("GIT_CONFIG_KEY_0", "core.hooksPath")
            .env("GIT_CONFIG_VALUE_0", null_device())
            .env("GIT_CONFIG_KEY_1", "init.templateDir")
            .env("GIT_CONFIG_VALUE_1", "")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait()? {
                Some(_) => break,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GitError::Timeout {
                        args: args_display,
                        secs: self.timeout.as_secs(),
                    });
                }
                None => std::thread::sleep(WAIT_POLL),
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::CommandFailed {
                args: args_display,
                code: output.status.code(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn null_device() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}

/// Runs a git command in `cwd` with the default timeout.
pub fn git_command(args: &[&str], cwd: &Path) -> Result<String> {
    GitInvocation::new(cwd, args).run()
}

/// Retrieve `user.name` from git configuration, if set.
pub fn get_git_user_name(cwd: &Path) -> Option<String> {
    match git_command(&["config", "user.name"], cwd) {
        Ok(name) if !name.is_empty() => Some(name),
        _ => None,
    }
}
