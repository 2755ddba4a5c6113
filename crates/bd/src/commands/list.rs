//! `bd list` -- list issues.

use anyhow::Result;

use beads_core::enums::{IssueType, Status};
use beads_core::filter::IssueFilter;
use beads_store::Storage;

use crate::cli::ListArgs;
use crate::context::CommandContext;
use crate::output::print_issues;

/// Execute the `bd list` command.
pub fn run(ctx: &CommandContext, args: &ListArgs) -> Result<()> {
    let filter = IssueFilter {
        status: args.status.as_deref().map(Status::from),
        issue_type: args.issue_type.as_deref().map(IssueType::from),
        assignee: args.assignee.clone(),
        labels: args.label.clone(),
        title_contains: args.title.clone(),
        limit: args.limit,
        ..Default::default()
    };

    let issues = ctx.store.list_issues(&filter)?;
    print_issues(&issues, ctx.json)
}
