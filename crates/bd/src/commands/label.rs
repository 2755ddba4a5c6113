//! `bd label` -- manage labels on an issue.

use anyhow::Result;

use beads_store::Storage;

use crate::cli::{LabelArgs, LabelCommands, LabelEditArgs};
use crate::context::CommandContext;

/// Execute the `bd label` command.
pub fn run(ctx: &CommandContext, args: &LabelArgs) -> Result<()> {
    match &args.command {
        LabelCommands::Add(edit) => run_add(ctx, edit),
        LabelCommands::Remove(edit) => run_remove(ctx, edit),
    }
}

fn run_add(ctx: &CommandContext, args: &LabelEditArgs) -> Result<()> {
    ctx.store.add_label(&args.id, &args.label, &ctx.actor)?;
    ctx.mark_dirty();
    if !ctx.json {
        println!("Labeled {} with '{}'", args.id, args.label);
    }
    Ok(())
}

fn run_remove(ctx: &CommandContext, args: &LabelEditArgs) -> Result<()> {
    ctx.store.remove_label(&args.id, &args.label, &ctx.actor)?;
    ctx.mark_dirty();
    if !ctx.json {
        println!("Removed '{}' from {}", args.label, args.id);
    }
    Ok(())
}
