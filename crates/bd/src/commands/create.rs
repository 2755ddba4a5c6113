//! `bd create` -- create a new issue.

use anyhow::{Result, bail};
use chrono::Utc;

use beads_core::dependency::Dependency;
use beads_core::enums::{DependencyType, IssueType};
use beads_core::idgen;
use beads_core::issue::IssueBuilder;
use beads_store::Storage;

use crate::cli::CreateArgs;
use crate::context::CommandContext;
use crate::output::print_json;

/// Execute the `bd create` command.
pub fn run(ctx: &CommandContext, args: &CreateArgs) -> Result<()> {
    let issue_type = IssueType::from(args.issue_type.as_str()).normalize();
    let prefix = ctx.issue_prefix();

    let id = match &args.id {
        Some(explicit) => explicit.clone(),
        None => generate_unique_id(ctx, &prefix, &args.title)?,
    };

    let mut builder = IssueBuilder::new(&args.title)
        .id(&id)
        .issue_type(issue_type)
        .priority(args.priority)
        .created_by(&ctx.actor);
    if let Some(ref description) = args.description {
        builder = builder.description(description);
    }
    if let Some(ref assignee) = args.assignee {
        builder = builder.assignee(assignee);
    }
    let issue = builder.build();

    ctx.store.create_issue(&issue, &ctx.actor)?;
    for label in &args.label {
        ctx.store.add_label(&id, label, &ctx.actor)?;
    }
    if let Some(ref parent) = args.parent {
        ctx.store.add_dependency(
            &Dependency {
                created_by: ctx.actor.clone(),
                ..Dependency::new(&id, parent, DependencyType::ParentChild)
            },
            &ctx.actor,
        )?;
    }
    ctx.mark_dirty();
    ctx.touch(&id);

    if ctx.json {
        print_json(&serde_json::json!({ "id": id }))?;
    } else {
        println!("Created {id}");
    }
    Ok(())
}

/// Generates a collision-free hash id, retrying with fresh nonces.
fn generate_unique_id(ctx: &CommandContext, prefix: &str, title: &str) -> Result<String> {
    let now = Utc::now();
    for nonce in 0..10 {
        let candidate = idgen::generate_hash_id(
            prefix,
            title,
            &ctx.actor,
            now,
            idgen::DEFAULT_HASH_LENGTH,
            nonce,
        );
        match ctx.store.get_issue(&candidate) {
            Err(e) if e.is_not_found() => return Ok(candidate),
            Ok(_) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    bail!("failed to generate a unique id after 10 attempts");
}
