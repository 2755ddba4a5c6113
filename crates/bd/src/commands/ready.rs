//! `bd ready` -- show ready work.

use anyhow::Result;

use beads_core::filter::WorkFilter;
use beads_store::Storage;

use crate::cli::ReadyArgs;
use crate::context::CommandContext;
use crate::output::print_issues;

/// Execute the `bd ready` command.
pub fn run(ctx: &CommandContext, args: &ReadyArgs) -> Result<()> {
    let filter = WorkFilter {
        assignee: args.assignee.clone(),
        unassigned: args.unassigned,
        limit: args.limit,
        ..Default::default()
    };

    let issues = ctx.store.get_ready_work(&filter)?;
    print_issues(&issues, ctx.json)
}
