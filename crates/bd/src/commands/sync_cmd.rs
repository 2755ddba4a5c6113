//! `bd sync` -- pull, merge, export, push.

use anyhow::Result;

use beads_sync::{SyncEngine, SyncOptions};

use crate::cli::SyncArgs;
use crate::context::CommandContext;
use crate::output::print_json;

/// Execute the `bd sync` command.
pub fn run(ctx: &CommandContext, args: &SyncArgs) -> Result<()> {
    let opts = SyncOptions {
        actor: ctx.actor.clone(),
        tombstone_ttl_days: ctx.config.sync.tombstone_ttl_days,
        clock_skew_warn_hours: ctx.config.sync.clock_skew_warn_hours,
        no_push: args.no_push || ctx.config.git.no_push,
    };

    let engine = SyncEngine::new(&ctx.repo, ctx.store.as_ref(), opts);
    let report = engine.sync()?;

    if ctx.json {
        print_json(&serde_json::json!({
            "merged": report.merged,
            "resurrected": report.resurrected,
            "cycles_resolved": report.cycles_resolved,
            "skew_warnings": report.skew_warnings,
            "pushed": report.pushed,
        }))?;
    } else {
        println!("Synced: {} issue(s) in the merged state", report.merged);
        for id in &report.resurrected {
            println!("  resurrected {id} (modification beat a concurrent delete)");
        }
        if report.cycles_resolved > 0 {
            println!(
                "  dropped {} edge(s) to break merge-created cycles (see events)",
                report.cycles_resolved
            );
        }
        if report.skew_warnings > 0 {
            println!("  {} clock-skew warning(s) recorded", report.skew_warnings);
        }
        if !report.pushed {
            println!("  (not pushed)");
        }
    }
    Ok(())
}
