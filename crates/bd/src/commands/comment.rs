//! `bd comment` -- add a comment to an issue.

use anyhow::Result;

use beads_store::Storage;

use crate::cli::CommentArgs;
use crate::context::CommandContext;
use crate::output::print_json;

/// Execute the `bd comment` command.
pub fn run(ctx: &CommandContext, args: &CommentArgs) -> Result<()> {
    let id = ctx.resolve_id(&args.id)?;
    let comment = ctx.store.add_comment(&id, &ctx.actor, &args.text)?;
    ctx.mark_dirty();
    ctx.touch(&id);

    if ctx.json {
        print_json(&comment)?;
    } else {
        println!("Comment [{}] added to {id}", comment.index);
    }
    Ok(())
}
