//! `bd show` -- show issue details.

use anyhow::Result;

use beads_store::Storage;

use crate::cli::ShowArgs;
use crate::context::CommandContext;
use crate::output::print_json;

/// Execute the `bd show` command.
pub fn run(ctx: &CommandContext, args: &ShowArgs) -> Result<()> {
    let id = ctx.resolve_id(&args.id)?;
    let issue = ctx.store.get_issue_hydrated(&id)?;
    ctx.touch(&issue.id);

    if ctx.json {
        return print_json(&issue);
    }

    println!("{}: {}", issue.id, issue.title);
    println!("  type:     {}", issue.issue_type);
    println!("  status:   {}", issue.status);
    println!("  priority: P{}", issue.priority);
    if !issue.assignee.is_empty() {
        println!("  assignee: {}", issue.assignee);
    }
    if !issue.description.is_empty() {
        println!("  description: {}", issue.description);
    }
    if !issue.spec_id.is_empty() {
        println!("  spec: {}", issue.spec_id);
    }
    if let Some(ref ext) = issue.external_ref {
        println!("  external: {ext}");
    }
    if !issue.labels.is_empty() {
        println!("  labels: {}", issue.labels.join(", "));
    }
    if !issue.close_reason.is_empty() {
        println!("  closed: {}", issue.close_reason);
    }
    for dep in &issue.dependencies {
        println!("  dep: {} ({})", dep.depends_on_id, dep.dep_type);
    }
    for comment in &issue.comments {
        println!(
            "  [{}] {} at {}: {}",
            comment.index,
            comment.author,
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.text
        );
    }
    Ok(())
}
