//! `bd init` -- initialize a beads workspace.

use anyhow::{Context, Result, bail};

use beads_config::{BeadsConfig, ensure_beads_dir, save_config};
use beads_git::commands::git_command;
use beads_journal::export::full_export;
use beads_store::{SqliteStore, Storage};

use crate::cli::{GlobalArgs, InitArgs};
use crate::output::print_json;

/// Lines for `.beads/.gitignore`: only the journal and config travel
/// through git; the database, locks, and the per-clone sync base stay
/// local.
const BEADS_GITIGNORE: &str = "*\n!.gitignore\n!issues.jsonl\n!config.yaml\n";

/// Execute the `bd init` command.
pub fn run(global: &GlobalArgs, args: &InitArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let Some(repo_root) = git_toplevel(&cwd) else {
        bail!("not inside a git repository; run 'git init' first");
    };

    let beads_dir = ensure_beads_dir(&repo_root)?;
    let gitignore = beads_dir.join(".gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, BEADS_GITIGNORE)?;
    }

    // Opening the store creates the schema; record the prefix in both the
    // store config and the yaml so either survives a reclone.
    let store = SqliteStore::open(beads_dir.join("beads.db"))
        .with_context(|| format!("failed to create store in {}", beads_dir.display()))?;
    store.set_config("issue_prefix", &args.prefix)?;

    let config_path = beads_dir.join(beads_config::config::CONFIG_FILE_NAME);
    if !config_path.exists() {
        let config = BeadsConfig {
            prefix: Some(args.prefix.clone()),
            ..Default::default()
        };
        save_config(&beads_dir, &config)?;
    }

    // An empty journal marks the workspace as initialized for other
    // clones.
    let journal = beads_dir.join("issues.jsonl");
    if !journal.exists() {
        full_export(&store, &journal)?;
    }
    store.close()?;

    register_merge_driver(&repo_root)?;

    if global.json {
        print_json(&serde_json::json!({
            "beads_dir": beads_dir,
            "prefix": args.prefix,
        }))?;
    } else {
        println!("Initialized beads workspace at {}", beads_dir.display());
        println!("Issue prefix: {}", args.prefix);
    }
    Ok(())
}

fn git_toplevel(cwd: &std::path::Path) -> Option<std::path::PathBuf> {
    git_command(&["rev-parse", "--show-toplevel"], cwd)
        .ok()
        .map(std::path::PathBuf::from)
}

/// Points git at the journal-aware merge driver so concurrent journal
/// edits merge field-by-field instead of line-by-line.
fn register_merge_driver(repo_root: &std::path::Path) -> Result<()> {
    const ATTR_LINE: &str = ".beads/issues.jsonl merge=beads\n";

    let attributes = repo_root.join(".gitattributes");
    let existing = std::fs::read_to_string(&attributes).unwrap_or_default();
    if !existing.contains("merge=beads") {
        std::fs::write(&attributes, format!("{existing}{ATTR_LINE}"))?;
    }

    // Repo-local config; the driver itself ships with bd.
    git_command(
        &["config", "merge.beads.name", "beads journal merge"],
        repo_root,
    )?;
    git_command(
        &["config", "merge.beads.driver", "bd merge-driver %A %O %B"],
        repo_root,
    )?;
    Ok(())
}
