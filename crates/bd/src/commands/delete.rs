//! `bd delete` -- delete an issue, leaving a tombstone.

use anyhow::{Result, bail};

use beads_store::Storage;

use crate::cli::DeleteArgs;
use crate::context::CommandContext;

/// Execute the `bd delete` command.
pub fn run(ctx: &CommandContext, args: &DeleteArgs) -> Result<()> {
    if !args.force {
        bail!(
            "refusing to delete {} without --force (deletions propagate to every clone)",
            args.id
        );
    }

    ctx.store.delete_issue(&args.id, &ctx.actor)?;
    ctx.mark_dirty();

    if !ctx.json {
        println!("Deleted {}", args.id);
    }
    Ok(())
}
