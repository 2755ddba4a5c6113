//! `bd stats` -- aggregate statistics.

use anyhow::Result;

use beads_store::Storage;

use crate::context::CommandContext;
use crate::output::print_json;

/// Execute the `bd stats` command.
pub fn run(ctx: &CommandContext) -> Result<()> {
    let stats = ctx.store.get_statistics()?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "total": stats.total_issues,
            "open": stats.open_issues,
            "in_progress": stats.in_progress_issues,
            "blocked": stats.blocked_issues,
            "deferred": stats.deferred_issues,
            "closed": stats.closed_issues,
            "by_type": stats.by_type,
            "by_priority": stats.by_priority,
        }));
    }

    println!("Issues: {} total", stats.total_issues);
    println!("  open:        {}", stats.open_issues);
    println!("  in_progress: {}", stats.in_progress_issues);
    println!("  blocked:     {}", stats.blocked_issues);
    println!("  deferred:    {}", stats.deferred_issues);
    println!("  closed:      {}", stats.closed_issues);
    if !stats.by_type.is_empty() {
        println!("By type:");
        for (issue_type, count) in &stats.by_type {
            println!("  {issue_type}: {count}");
        }
    }
    Ok(())
}
