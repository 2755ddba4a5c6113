//! `bd import` -- read the journal into the store.

use anyhow::Result;

use beads_journal::import::import_file;

use crate::context::CommandContext;
use crate::output::print_json;

/// Execute the `bd import` command.
pub fn run(ctx: &CommandContext) -> Result<()> {
    let journal = ctx.repo.journal_path();
    let report = import_file(ctx.store.as_ref(), &journal)?;

    if ctx.json {
        print_json(&serde_json::json!({
            "total": report.total,
            "changed": report.changed,
            "unchanged": report.unchanged,
            "deleted": report.deleted,
        }))?;
    } else {
        println!(
            "Imported {} record(s): {} changed, {} unchanged, {} deleted",
            report.total, report.changed, report.unchanged, report.deleted
        );
    }
    Ok(())
}
