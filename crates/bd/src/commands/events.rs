//! `bd events` -- show the audit trail for an issue.

use anyhow::Result;

use beads_store::Storage;

use crate::cli::EventsArgs;
use crate::context::CommandContext;
use crate::output::print_json;

/// Execute the `bd events` command.
pub fn run(ctx: &CommandContext, args: &EventsArgs) -> Result<()> {
    let events = ctx.store.get_events(&args.id, args.limit)?;

    if ctx.json {
        return print_json(&events);
    }

    if events.is_empty() {
        println!("No events for {}.", args.id);
        return Ok(());
    }
    for event in &events {
        let mut line = format!(
            "{} {} by {}",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.actor
        );
        match (&event.old_value, &event.new_value) {
            (Some(old), Some(new)) => line.push_str(&format!(" ({old} -> {new})")),
            (None, Some(new)) => line.push_str(&format!(" ({new})")),
            (Some(old), None) => line.push_str(&format!(" ({old})")),
            (None, None) => {}
        }
        println!("{line}");
    }
    Ok(())
}
