//! `bd blocked` -- show blocked issues.

use anyhow::Result;

use beads_core::filter::WorkFilter;
use beads_store::Storage;

use crate::cli::BlockedArgs;
use crate::context::CommandContext;
use crate::output::{issue_line, print_json};

/// Execute the `bd blocked` command.
pub fn run(ctx: &CommandContext, args: &BlockedArgs) -> Result<()> {
    let filter = WorkFilter {
        limit: args.limit,
        ..Default::default()
    };
    let blocked = ctx.store.get_blocked_issues(&filter)?;

    if ctx.json {
        let rows: Vec<serde_json::Value> = blocked
            .iter()
            .map(|b| {
                serde_json::json!({
                    "issue": b.issue,
                    "blocked_by_count": b.blocked_by_count,
                })
            })
            .collect();
        return print_json(&rows);
    }

    if blocked.is_empty() {
        println!("No blocked issues.");
        return Ok(());
    }
    for b in &blocked {
        println!("{} [{} blocker(s)]", issue_line(&b.issue), b.blocked_by_count);
    }
    Ok(())
}
