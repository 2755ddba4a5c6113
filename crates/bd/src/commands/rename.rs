//! `bd rename` -- give an issue a fresh id.

use anyhow::Result;

use beads_store::Storage;

use crate::cli::RenameArgs;
use crate::context::CommandContext;

/// Execute the `bd rename` command.
pub fn run(ctx: &CommandContext, args: &RenameArgs) -> Result<()> {
    ctx.store
        .rename_issue(&args.id, &args.new_id, &ctx.actor)?;
    ctx.mark_dirty();

    if !ctx.json {
        println!("Renamed {} -> {}", args.id, args.new_id);
    }
    Ok(())
}
