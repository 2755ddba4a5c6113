//! `bd export` -- write the store to the journal.

use anyhow::Result;

use beads_journal::export::{full_export, incremental_export};

use crate::cli::ExportArgs;
use crate::context::CommandContext;
use crate::output::print_json;

/// Execute the `bd export` command.
pub fn run(ctx: &CommandContext, args: &ExportArgs) -> Result<()> {
    let journal = ctx.repo.journal_path();
    let report = if args.full {
        full_export(ctx.store.as_ref(), &journal)?
    } else {
        incremental_export(ctx.store.as_ref(), &journal)?
    };

    if ctx.json {
        print_json(&serde_json::json!({
            "journal": journal,
            "exported": report.exported,
            "full": report.full,
        }))?;
    } else {
        println!(
            "Exported {} issue(s) to {}",
            report.exported.len(),
            ctx.repo.rel_path(&journal).display()
        );
    }
    Ok(())
}
