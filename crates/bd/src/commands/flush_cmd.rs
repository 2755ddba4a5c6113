//! `bd flush` -- force a journal flush now.

use anyhow::Result;

use crate::context::CommandContext;

/// Execute the `bd flush` command.
pub fn run(ctx: &CommandContext) -> Result<()> {
    ctx.flush.flush_now()?;
    if !ctx.json {
        println!(
            "Flushed to {}",
            ctx.repo.rel_path(&ctx.repo.journal_path()).display()
        );
    }
    Ok(())
}
