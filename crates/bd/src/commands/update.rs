//! `bd update` -- update issue fields.

use anyhow::{Result, bail};

use beads_core::enums::{IssueType, Status};
use beads_store::{IssueUpdates, Storage};

use crate::cli::UpdateArgs;
use crate::context::CommandContext;

/// Execute the `bd update` command.
pub fn run(ctx: &CommandContext, args: &UpdateArgs) -> Result<()> {
    let updates = IssueUpdates {
        title: args.title.clone(),
        description: args.description.clone(),
        status: args.status.as_deref().map(Status::from),
        priority: args.priority,
        issue_type: args.issue_type.as_deref().map(IssueType::from),
        assignee: args.assignee.clone(),
        spec_id: args.spec_id.clone(),
        external_ref: args
            .external_ref
            .clone()
            .map(|ext| if ext.is_empty() { None } else { Some(ext) }),
        ..Default::default()
    };

    if updates.is_empty() {
        bail!("nothing to update; pass at least one field flag");
    }

    let id = ctx.resolve_id(&args.id)?;
    ctx.store.update_issue(&id, &updates, &ctx.actor)?;
    ctx.mark_dirty();
    ctx.touch(&id);

    if !ctx.json {
        println!("Updated {id}");
    }
    Ok(())
}
