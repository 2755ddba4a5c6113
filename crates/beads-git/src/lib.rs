//! Git integration for the beads system.
//!
//! [`commands`] wraps git subprocess invocation with hook/template
//! hardening and timeouts; [`context`] resolves which repository,
//! worktree, and `.beads/` directory an operation acts on.

pub mod commands;
pub mod context;

pub use commands::{GitError, GitInvocation};
pub use context::{ContextError, RepoContext};
