//! Runtime context for command execution.
//!
//! [`CommandContext`] holds everything a command handler needs: the
//! resolved repository context, the open store, the flush coordinator,
//! and the actor identity. It is constructed once in `main` after CLI
//! parsing and threaded explicitly through every handler; there is no
//! global store or coordinator.

use std::env;
use std::sync::{Arc, Mutex};

use anyhow::{Context as _, Result, bail};

use beads_config::BeadsConfig;
use beads_git::RepoContext;
use beads_git::commands::get_git_user_name;
use beads_journal::FlushCoordinator;
use beads_store::{SqliteStore, Storage};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
pub struct CommandContext {
    /// Resolved repository/worktree/journal locations.
    pub repo: RepoContext,

    /// The open store.
    pub store: Arc<SqliteStore>,

    /// The journal flush coordinator.
    pub flush: FlushCoordinator,

    /// Workspace configuration from `.beads/config.yaml`.
    pub config: BeadsConfig,

    /// Actor name for the audit trail.
    pub actor: String,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Last issue id touched by this process. Advisory only; never
    /// consulted on correctness-critical paths.
    last_touched: Mutex<Option<String>>,
}

impl CommandContext {
    /// Resolves the workspace and opens the store.
    ///
    /// Fails if no `.beads/` directory exists (commands other than
    /// `init` require one).
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let repo = RepoContext::resolve()?;
        let config = beads_config::load_config(&repo.beads_dir)?;
        let actor = resolve_actor(global.actor.as_deref(), &config, &repo);

        let store = Arc::new(
            SqliteStore::open(repo.db_path())
                .with_context(|| format!("failed to open store in {}", repo.beads_dir.display()))?,
        );

        // Fresh clone: the journal travels through git but the database
        // does not. Hydrate once before the first command runs.
        let journal = repo.journal_path();
        if journal.exists()
            && store
                .get_metadata(beads_store::META_LAST_IMPORT_HASH)?
                .is_none()
        {
            beads_journal::import::import_file(store.as_ref(), &journal)?;
        }

        let flush = FlushCoordinator::new(
            Arc::clone(&store) as Arc<dyn Storage>,
            repo.journal_path(),
            std::time::Duration::from_secs(config.flush.debounce_seconds),
        );

        Ok(Self {
            repo,
            store,
            flush,
            config,
            actor,
            json: global.json,
            last_touched: Mutex::new(None),
        })
    }

    /// Records the id an operation just touched, for `"last"` shorthand
    /// resolution. Persisted best-effort; failures here never fail the
    /// operation itself.
    pub fn touch(&self, id: &str) {
        // A poisoned lock only means a panicking thread died mid-update;
        // this field is advisory, so recover the value rather than
        // propagate.
        let mut guard = self
            .last_touched
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        *guard = Some(id.to_string());
        let _ = self.store.set_config("last_touched_id", id);
    }

    /// Resolves the `"last"` shorthand to the most recently touched id.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        if input != "last" {
            return Ok(input.to_string());
        }
        if let Some(id) = self
            .last_touched
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
        {
            return Ok(id);
        }
        match self.store.get_config("last_touched_id")? {
            Some(id) => Ok(id),
            None => bail!("no last-touched issue recorded yet"),
        }
    }

    /// Notifies the coordinator that the store changed.
    pub fn mark_dirty(&self) {
        self.flush.mark_dirty(false);
    }

    /// Flushes pending changes and closes the store. Every command path
    /// ends here so a short-lived CLI still writes the journal before
    /// exiting.
    pub fn finish(self) -> Result<()> {
        self.flush.shutdown()?;
        self.store.close()?;
        Ok(())
    }

    /// The configured issue prefix (store config wins over file config).
    pub fn issue_prefix(&self) -> String {
        self.store
            .get_config("issue_prefix")
            .ok()
            .flatten()
            .or_else(|| self.config.prefix.clone())
            .unwrap_or_else(|| "bd".to_string())
    }
}

/// Resolves the actor name using the priority chain:
/// flag > BD_ACTOR > BEADS_ACTOR > config > git user.name > USER >
/// "unknown".
pub fn resolve_actor(
    flag_value: Option<&str>,
    config: &BeadsConfig,
    repo: &RepoContext,
) -> String {
    if let Some(actor) = flag_value {
        if !actor.is_empty() {
            return actor.to_string();
        }
    }

    for var in ["BD_ACTOR", "BEADS_ACTOR"] {
        if let Ok(actor) = env::var(var) {
            if !actor.is_empty() {
                return actor;
            }
        }
    }

    if let Some(actor) = config.actor.as_deref() {
        if !actor.is_empty() {
            return actor.to_string();
        }
    }

    if let Some(name) = get_git_user_name(&repo.repo_root) {
        return name;
    }

    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        if !user.is_empty() {
            return user;
        }
    }

    "unknown".to_string()
}
