//! `bd close` / `bd reopen` -- close and reopen issues.

use anyhow::Result;

use beads_store::Storage;

use crate::cli::{CloseArgs, ReopenArgs};
use crate::context::CommandContext;

/// Execute the `bd close` command.
pub fn run_close(ctx: &CommandContext, args: &CloseArgs) -> Result<()> {
    for id in &args.ids {
        let id = ctx.resolve_id(id)?;
        ctx.store.close_issue(&id, &args.reason, &ctx.actor)?;
        ctx.touch(&id);
        if !ctx.json {
            println!("Closed {id} ({})", args.reason);
        }
    }
    ctx.mark_dirty();
    Ok(())
}

/// Execute the `bd reopen` command.
pub fn run_reopen(ctx: &CommandContext, args: &ReopenArgs) -> Result<()> {
    ctx.store.reopen_issue(&args.id, &ctx.actor)?;
    ctx.mark_dirty();
    if !ctx.json {
        println!("Reopened {}", args.id);
    }
    Ok(())
}
