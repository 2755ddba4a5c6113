//! Clap CLI definitions for the `bd` command.

use clap::{Args, Parser, Subcommand};

/// bd -- Dependency-aware issue tracker.
///
/// Issues chained together like beads: a lightweight, git-backed tracker
/// with first-class dependency support.
#[derive(Parser, Debug)]
#[command(
    name = "bd",
    about = "Dependency-aware issue tracker",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Actor name for the audit trail (default: $BD_ACTOR, git
    /// user.name, $USER).
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a beads workspace in the current repository.
    Init(InitArgs),

    /// Create a new issue.
    #[command(alias = "new")]
    Create(CreateArgs),

    /// Show issue details.
    #[command(alias = "view")]
    Show(ShowArgs),

    /// List issues.
    List(ListArgs),

    /// Update issue fields.
    Update(UpdateArgs),

    /// Close one or more issues.
    Close(CloseArgs),

    /// Reopen a closed issue.
    Reopen(ReopenArgs),

    /// Delete an issue (tombstoned so the deletion syncs).
    Delete(DeleteArgs),

    /// Give an issue a fresh id, rewriting all edges.
    Rename(RenameArgs),

    /// Manage dependencies between issues.
    Dep(DepArgs),

    /// Manage labels on an issue.
    Label(LabelArgs),

    /// Add a comment to an issue.
    Comment(CommentArgs),

    /// Show ready work (open or in progress, no active blockers).
    Ready(ReadyArgs),

    /// Show blocked issues and what blocks them.
    Blocked(BlockedArgs),

    /// Show the audit trail for an issue.
    Events(EventsArgs),

    /// Show aggregate statistics.
    Stats,

    /// Export the store to the journal file.
    Export(ExportArgs),

    /// Import the journal file into the store.
    Import,

    /// Sync with the remote: pull, 3-way merge, export, push.
    Sync(SyncArgs),

    /// Force a journal flush now.
    Flush,

    /// Git merge driver for the journal (invoked as `%A %O %B`).
    #[command(name = "merge-driver", hide = true)]
    MergeDriver(MergeDriverArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Issue id prefix for this workspace (default "bd").
    #[arg(long, default_value = "bd")]
    pub prefix: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Issue title.
    pub title: String,

    /// Issue type (bug|feature|task|epic|chore|message).
    #[arg(short = 't', long = "type", default_value = "task")]
    pub issue_type: String,

    /// Priority 0-4 (0 = most urgent).
    #[arg(short, long, default_value_t = 2)]
    pub priority: i32,

    /// Longer description.
    #[arg(short, long)]
    pub description: Option<String>,

    /// Assignee.
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Labels to attach (repeatable).
    #[arg(short, long)]
    pub label: Vec<String>,

    /// Explicit issue id (defaults to a generated hash id).
    #[arg(long)]
    pub id: Option<String>,

    /// Parent issue id (creates a parent-child dependency).
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Issue id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status.
    #[arg(short, long)]
    pub status: Option<String>,

    /// Filter by issue type.
    #[arg(short = 't', long = "type")]
    pub issue_type: Option<String>,

    /// Filter by assignee.
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Require ALL of these labels (repeatable).
    #[arg(short, long)]
    pub label: Vec<String>,

    /// Substring match on the title.
    #[arg(long)]
    pub title: Option<String>,

    /// Maximum issues to show.
    #[arg(short = 'n', long)]
    pub limit: Option<i32>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Issue id.
    pub id: String,

    /// New title.
    #[arg(long)]
    pub title: Option<String>,

    /// New description.
    #[arg(short, long)]
    pub description: Option<String>,

    /// New status (open|in_progress|blocked|deferred|closed).
    #[arg(short, long)]
    pub status: Option<String>,

    /// New priority 0-4.
    #[arg(short, long)]
    pub priority: Option<i32>,

    /// New issue type.
    #[arg(short = 't', long = "type")]
    pub issue_type: Option<String>,

    /// New assignee (empty string clears).
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// New spec id.
    #[arg(long)]
    pub spec_id: Option<String>,

    /// New external reference (tracker URL).
    #[arg(long)]
    pub external_ref: Option<String>,
}

#[derive(Args, Debug)]
pub struct CloseArgs {
    /// Issue ids to close.
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Close reason.
    #[arg(short, long, default_value = "completed")]
    pub reason: String,
}

#[derive(Args, Debug)]
pub struct ReopenArgs {
    /// Issue id.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Issue id.
    pub id: String,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Current issue id.
    pub id: String,

    /// New issue id.
    pub new_id: String,
}

#[derive(Args, Debug)]
pub struct DepArgs {
    #[command(subcommand)]
    pub command: DepCommands,
}

#[derive(Subcommand, Debug)]
pub enum DepCommands {
    /// Add a dependency: FROM depends on TO.
    Add(DepAddArgs),

    /// Remove a dependency.
    #[command(alias = "rm")]
    Remove(DepAddArgs),

    /// Show the dependency tree from an issue.
    Tree(DepTreeArgs),
}

#[derive(Args, Debug)]
pub struct DepAddArgs {
    /// The dependent issue.
    pub from: String,

    /// The issue it depends on.
    pub to: String,

    /// Dependency kind (blocks|parent-child|related|discovered-from|
    /// conditional-blocks|waits-for|replies-to).
    #[arg(short = 't', long = "type", default_value = "blocks")]
    pub dep_type: String,
}

#[derive(Args, Debug)]
pub struct DepTreeArgs {
    /// Root issue id.
    pub id: String,

    /// Maximum traversal depth.
    #[arg(long, default_value_t = 5)]
    pub depth: i32,

    /// Follow incoming edges (who depends on this issue).
    #[arg(short, long)]
    pub reverse: bool,
}

#[derive(Args, Debug)]
pub struct LabelArgs {
    #[command(subcommand)]
    pub command: LabelCommands,
}

#[derive(Subcommand, Debug)]
pub enum LabelCommands {
    /// Add a label to an issue.
    Add(LabelEditArgs),

    /// Remove a label from an issue.
    #[command(alias = "rm")]
    Remove(LabelEditArgs),
}

#[derive(Args, Debug)]
pub struct LabelEditArgs {
    /// Issue id.
    pub id: String,

    /// Label name.
    pub label: String,
}

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Issue id.
    pub id: String,

    /// Comment text.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct ReadyArgs {
    /// Filter by assignee.
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Only unassigned issues.
    #[arg(short, long)]
    pub unassigned: bool,

    /// Maximum issues to show.
    #[arg(short = 'n', long)]
    pub limit: Option<i32>,
}

#[derive(Args, Debug)]
pub struct BlockedArgs {
    /// Maximum issues to show.
    #[arg(short = 'n', long)]
    pub limit: Option<i32>,
}

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Issue id.
    pub id: String,

    /// Maximum events to show.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: i32,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Rewrite the whole journal instead of only dirty issues.
    #[arg(long)]
    pub full: bool,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Merge and commit but skip the push.
    #[arg(long)]
    pub no_push: bool,
}

#[derive(Args, Debug)]
pub struct MergeDriverArgs {
    /// Current version (%A); the merge result is written here.
    pub current: String,

    /// Common ancestor (%O).
    pub ancestor: String,

    /// Other branch's version (%B).
    pub other: String,
}
