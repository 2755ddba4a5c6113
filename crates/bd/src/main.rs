//! `bd` -- dependency-aware issue tracker CLI.
//!
//! Parses arguments with clap, builds a [`CommandContext`], and
//! dispatches to the command handlers. Exit codes: 0 success, 1 general
//! failure, 2 usage error (clap), 3 merge conflict requiring
//! intervention, 4 integrity/precondition failure.

mod cli;
mod commands;
mod context;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use beads_git::ContextError;
use beads_journal::JournalError;
use beads_store::StorageError;
use beads_sync::SyncError;

use cli::{Cli, Commands};
use context::CommandContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C: exit cleanly. Second: force exit.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(0);
    });

    let cli = Cli::parse();

    if cli.global.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("bd=debug,beads_store=debug,beads_journal=debug,beads_sync=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let result = run(&cli);

    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({ "error": format!("{e:#}") });
            eprintln!("{}", serde_json::to_string_pretty(&err_json).unwrap_or_default());
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(exit_code(&e));
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        return Ok(());
    };

    // Init creates the workspace; the merge driver runs on bare files
    // (git hands it paths); everything else requires an open store.
    if let Commands::Init(args) = command {
        return commands::init::run(&cli.global, args);
    }
    if let Commands::MergeDriver(args) = command {
        return commands::merge_driver::run(args);
    }

    let ctx = CommandContext::load(&cli.global)?;
    let result = match command {
        Commands::Init(_) | Commands::MergeDriver(_) => unreachable!("handled above"),
        Commands::Create(args) => commands::create::run(&ctx, args),
        Commands::Show(args) => commands::show::run(&ctx, args),
        Commands::List(args) => commands::list::run(&ctx, args),
        Commands::Update(args) => commands::update::run(&ctx, args),
        Commands::Close(args) => commands::close::run_close(&ctx, args),
        Commands::Reopen(args) => commands::close::run_reopen(&ctx, args),
        Commands::Delete(args) => commands::delete::run(&ctx, args),
        Commands::Rename(args) => commands::rename::run(&ctx, args),
        Commands::Dep(args) => commands::dep::run(&ctx, args),
        Commands::Label(args) => commands::label::run(&ctx, args),
        Commands::Comment(args) => commands::comment::run(&ctx, args),
        Commands::Ready(args) => commands::ready::run(&ctx, args),
        Commands::Blocked(args) => commands::blocked::run(&ctx, args),
        Commands::Events(args) => commands::events::run(&ctx, args),
        Commands::Stats => commands::stats::run(&ctx),
        Commands::Export(args) => commands::export::run(&ctx, args),
        Commands::Import => commands::import::run(&ctx),
        Commands::Sync(args) => commands::sync_cmd::run(&ctx, args),
        Commands::Flush => commands::flush_cmd::run(&ctx),
    };

    // Flush and close even after a command error, but report the command
    // error first.
    let finish = ctx.finish();
    result?;
    finish
}

/// Maps error kinds to the documented exit codes.
fn exit_code(e: &anyhow::Error) -> i32 {
    for cause in e.chain() {
        if let Some(sync_err) = cause.downcast_ref::<SyncError>() {
            return match sync_err {
                SyncError::UnresolvedJournalConflict { .. } => 3,
                _ => 1,
            };
        }
        if let Some(journal_err) = cause.downcast_ref::<JournalError>() {
            return match journal_err {
                JournalError::ConflictMarkers { .. } => 3,
                _ => 1,
            };
        }
        if let Some(storage_err) = cause.downcast_ref::<StorageError>() {
            return match storage_err {
                StorageError::DepthExceeded { .. }
                | StorageError::Migration { .. }
                | StorageError::StoreInactive => 4,
                _ => 1,
            };
        }
        if let Some(ctx_err) = cause.downcast_ref::<ContextError>() {
            return match ctx_err {
                ContextError::NoBeads
                | ContextError::UnsafePath(_)
                | ContextError::WorktreeDetached(_) => 4,
                _ => 1,
            };
        }
    }
    1
}
