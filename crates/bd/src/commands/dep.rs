//! `bd dep` -- manage dependencies between issues.

use anyhow::Result;

use beads_core::dependency::Dependency;
use beads_core::enums::DependencyType;
use beads_store::Storage;

use crate::cli::{DepArgs, DepAddArgs, DepCommands, DepTreeArgs};
use crate::context::CommandContext;
use crate::output::{issue_line, print_json};

/// Execute the `bd dep` command.
pub fn run(ctx: &CommandContext, args: &DepArgs) -> Result<()> {
    match &args.command {
        DepCommands::Add(add) => run_add(ctx, add),
        DepCommands::Remove(remove) => run_remove(ctx, remove),
        DepCommands::Tree(tree) => run_tree(ctx, tree),
    }
}

fn run_add(ctx: &CommandContext, args: &DepAddArgs) -> Result<()> {
    let dep = Dependency {
        created_by: ctx.actor.clone(),
        ..Dependency::new(&args.from, &args.to, DependencyType::from(args.dep_type.as_str()))
    };
    ctx.store.add_dependency(&dep, &ctx.actor)?;
    ctx.mark_dirty();

    if !ctx.json {
        println!("{} now depends on {} ({})", args.from, args.to, args.dep_type);
    }
    Ok(())
}

fn run_remove(ctx: &CommandContext, args: &DepAddArgs) -> Result<()> {
    ctx.store.remove_dependency(
        &args.from,
        &args.to,
        &DependencyType::from(args.dep_type.as_str()),
        &ctx.actor,
    )?;
    ctx.mark_dirty();

    if !ctx.json {
        println!("Removed {} -> {} ({})", args.from, args.to, args.dep_type);
    }
    Ok(())
}

fn run_tree(ctx: &CommandContext, args: &DepTreeArgs) -> Result<()> {
    let tree = ctx
        .store
        .get_dependency_tree(&args.id, args.depth, args.reverse)?;

    if ctx.json {
        let nodes: Vec<serde_json::Value> = tree
            .iter()
            .map(|node| {
                serde_json::json!({
                    "id": node.issue.id,
                    "title": node.issue.title,
                    "depth": node.depth,
                    "kind": node.dep_type.as_str(),
                })
            })
            .collect();
        return print_json(&nodes);
    }

    for node in &tree {
        let indent = "  ".repeat(node.depth as usize);
        if node.depth == 0 {
            println!("{}", issue_line(&node.issue));
        } else {
            println!("{indent}{} {}", node.dep_type, issue_line(&node.issue));
        }
    }
    Ok(())
}
