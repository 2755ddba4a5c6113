//! Storage and Transaction traits -- the public API for issue persistence.
//!
//! Consumers depend on these traits rather than on the concrete SQLite
//! implementation so that the journal and sync layers can be tested
//! against mocks and alternative backends can be substituted.

use beads_core::comment::{Comment, Event};
use beads_core::dependency::Dependency;
use beads_core::enums::{DependencyType, EventType, IssueType, Status};
use beads_core::filter::{IssueFilter, WorkFilter};
use beads_core::issue::Issue;
use beads_core::tombstone::Tombstone;

use crate::error::Result;

// ---------------------------------------------------------------------------
// View / helper types
// ---------------------------------------------------------------------------

/// Typed partial-update struct for issues.
///
/// Only `Some` fields are applied; `None` fields are left unchanged.
/// Double-option fields distinguish "don't touch" from "clear".
#[derive(Debug, Clone, Default)]
pub struct IssueUpdates {
    pub title: Option<String>,
    pub description: Option<String>,
    pub spec_id: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<i32>,
    pub issue_type: Option<IssueType>,
    pub assignee: Option<String>,
    pub close_reason: Option<String>,
    pub ephemeral: Option<bool>,
    pub is_template: Option<bool>,
    pub await_type: Option<String>,
    pub await_id: Option<String>,
    pub external_ref: Option<Option<String>>,
    pub metadata: Option<Option<serde_json::Value>>,
}

impl IssueUpdates {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.spec_id.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.issue_type.is_none()
            && self.assignee.is_none()
            && self.close_reason.is_none()
            && self.ephemeral.is_none()
            && self.is_template.is_none()
            && self.await_type.is_none()
            && self.await_id.is_none()
            && self.external_ref.is_none()
            && self.metadata.is_none()
    }
}

/// A node in a dependency tree traversal.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// The issue at this node.
    pub issue: Issue,
    /// Depth from the root (0 = root).
    pub depth: i32,
    /// The dependency type of the edge leading to this node.
    pub dep_type: DependencyType,
}

/// An issue that is currently blocked, with its direct active blockers.
#[derive(Debug, Clone)]
pub struct BlockedIssue {
    /// The blocked issue.
    pub issue: Issue,
    /// Number of direct active blockers.
    pub blocked_by_count: i32,
}

/// Aggregate statistics about the issue database.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub total_issues: i64,
    pub open_issues: i64,
    pub in_progress_issues: i64,
    pub blocked_issues: i64,
    pub deferred_issues: i64,
    pub closed_issues: i64,

    /// Breakdown by issue type: `(type_name, count)`.
    pub by_type: Vec<(String, i64)>,
    /// Breakdown by priority: `(priority, count)`.
    pub by_priority: Vec<(i32, i64)>,
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// Primary storage interface for issue persistence.
///
/// Each operation is atomic: mutators run their statements, the audit
/// event, the dirty-set update, and the blocked-cache rebuild inside one
/// transaction.
pub trait Storage: Send + Sync {
    // -- Issue CRUD ----------------------------------------------------------

    /// Creates a new issue and emits a "created" event.
    fn create_issue(&self, issue: &Issue, actor: &str) -> Result<()>;

    /// Retrieves an issue by its ID (case-insensitive fallback for display
    /// forms).
    fn get_issue(&self, id: &str) -> Result<Issue>;

    /// Retrieves an issue with labels, dependencies, and comments hydrated.
    fn get_issue_hydrated(&self, id: &str) -> Result<Issue>;

    /// Lists issues matching the filter.
    fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Applies partial updates to an issue and emits an "updated" event.
    fn update_issue(&self, id: &str, updates: &IssueUpdates, actor: &str) -> Result<()>;

    /// Closes an issue (status=closed, closed_at=now) and emits a "closed"
    /// event.
    fn close_issue(&self, id: &str, reason: &str, actor: &str) -> Result<()>;

    /// Reopens a closed issue and emits a "reopened" event.
    fn reopen_issue(&self, id: &str, actor: &str) -> Result<()>;

    /// Deletes an issue, leaving a tombstone so the deletion syncs.
    fn delete_issue(&self, id: &str, actor: &str) -> Result<()>;

    /// Gives an issue a fresh id, rewriting all edges in one transaction.
    fn rename_issue(&self, old_id: &str, new_id: &str, actor: &str) -> Result<()>;

    // -- Dependencies --------------------------------------------------------

    /// Adds a dependency edge. Detects cycles for blocking kinds and
    /// returns [`StorageError::CycleDetected`] with the offending path.
    fn add_dependency(&self, dep: &Dependency, actor: &str) -> Result<()>;

    /// Removes a dependency edge.
    fn remove_dependency(
        &self,
        issue_id: &str,
        depends_on_id: &str,
        dep_type: &DependencyType,
        actor: &str,
    ) -> Result<()>;

    /// Returns raw dependency records for an issue.
    fn get_dependency_records(&self, issue_id: &str) -> Result<Vec<Dependency>>;

    /// Returns the issues that the given issue depends on.
    fn get_dependencies(&self, issue_id: &str) -> Result<Vec<Issue>>;

    /// Returns the issues that depend on the given issue.
    fn get_dependents(&self, issue_id: &str) -> Result<Vec<Issue>>;

    /// Traverses the dependency tree from the given root. `reverse`
    /// follows incoming edges instead of outgoing ones.
    fn get_dependency_tree(
        &self,
        issue_id: &str,
        max_depth: i32,
        reverse: bool,
    ) -> Result<Vec<TreeNode>>;

    // -- Labels --------------------------------------------------------------

    /// Adds a label to an issue.
    fn add_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()>;

    /// Removes a label from an issue.
    fn remove_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()>;

    /// Returns all labels for an issue.
    fn get_labels(&self, issue_id: &str) -> Result<Vec<String>>;

    // -- Comments and events -------------------------------------------------

    /// Appends a comment to an issue and returns the created comment.
    fn add_comment(&self, issue_id: &str, author: &str, text: &str) -> Result<Comment>;

    /// Returns all comments for an issue, ordered by index.
    fn get_comments(&self, issue_id: &str) -> Result<Vec<Comment>>;

    /// Returns recent events for an issue.
    fn get_events(&self, issue_id: &str, limit: i32) -> Result<Vec<Event>>;

    /// Records an audit event directly (used by the sync engine for
    /// merge-produced events).
    fn record_event(
        &self,
        issue_id: &str,
        event_type: &EventType,
        actor: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()>;

    // -- Work queries --------------------------------------------------------

    /// Returns issues that are ready to work on: open or in progress, not
    /// in the blocked cache, not templates. Never traverses the graph.
    fn get_ready_work(&self, filter: &WorkFilter) -> Result<Vec<Issue>>;

    /// Returns issues currently in the blocked cache.
    fn get_blocked_issues(&self, filter: &WorkFilter) -> Result<Vec<BlockedIssue>>;

    /// Returns the raw contents of the blocked cache.
    fn get_blocked_ids(&self) -> Result<Vec<String>>;

    // -- Statistics ----------------------------------------------------------

    /// Returns aggregate statistics about the issue database.
    fn get_statistics(&self) -> Result<Statistics>;

    // -- Config and metadata -------------------------------------------------

    /// Sets a configuration key-value pair.
    fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Gets a configuration value by key.
    fn get_config(&self, key: &str) -> Result<Option<String>>;

    /// Sets an internal metadata key (export hashes, import markers).
    fn set_metadata(&self, key: &str, value: &str) -> Result<()>;

    /// Gets an internal metadata value by key.
    fn get_metadata(&self, key: &str) -> Result<Option<String>>;

    // -- Dirty set -----------------------------------------------------------

    /// Returns the ids modified since the last successful export.
    fn dirty_ids(&self) -> Result<Vec<String>>;

    /// Marks a single issue dirty.
    fn mark_dirty(&self, id: &str) -> Result<()>;

    /// Marks every issue dirty (forces the next export to cover all).
    fn mark_all_dirty(&self) -> Result<()>;

    /// Atomically claims and clears the dirty set for an export. Ids
    /// dirtied by transactions that commit after the claim re-insert
    /// their rows, so a flush racing a mutation never loses it; a failed
    /// export puts the claimed ids back via [`Storage::mark_dirty`].
    fn take_dirty(&self) -> Result<Vec<String>>;

    // -- Tombstones ----------------------------------------------------------

    /// Returns all live tombstones.
    fn get_tombstones(&self) -> Result<Vec<Tombstone>>;

    /// Deletes tombstones older than the TTL; returns how many were
    /// purged.
    fn purge_expired_tombstones(&self, ttl_days: i64) -> Result<usize>;

    // -- Snapshots -----------------------------------------------------------

    /// Returns every live issue, fully hydrated, ordered by id.
    fn snapshot(&self) -> Result<Vec<Issue>>;

    // -- Transactions --------------------------------------------------------

    /// Executes a closure within a database transaction. If the closure
    /// returns `Ok`, the transaction commits; otherwise it rolls back.
    fn run_in_transaction(&self, f: &dyn Fn(&dyn Transaction) -> Result<()>) -> Result<()>;

    // -- Lifecycle -----------------------------------------------------------

    /// Returns `false` once the store has been closed.
    fn is_active(&self) -> bool;

    /// Closes the store. Further operations fail with
    /// [`StorageError::StoreInactive`].
    fn close(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Transaction trait
// ---------------------------------------------------------------------------

/// Subset of [`Storage`] operations available inside a transaction,
/// plus the bulk primitives the importer and sync engine need.
///
/// The blocked cache is NOT rebuilt per call here; batch callers invoke
/// [`Transaction::rebuild_blocked_cache`] once before the transaction
/// commits.
pub trait Transaction {
    fn create_issue(&self, issue: &Issue, actor: &str) -> Result<()>;

    /// Inserts or fully replaces an issue (scalars, labels, dependencies,
    /// comments). Returns `true` if anything changed.
    fn upsert_issue(&self, issue: &Issue, actor: &str) -> Result<bool>;

    fn get_issue(&self, id: &str) -> Result<Issue>;

    /// Removes an issue row without leaving a tombstone. The sync engine
    /// uses this when the merge outcome already carries the tombstone.
    fn delete_issue_row(&self, id: &str) -> Result<()>;

    fn add_dependency(&self, dep: &Dependency, actor: &str) -> Result<()>;
    fn add_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()>;

    /// Inserts a comment with an explicit index and timestamp (import
    /// path; no event emitted).
    fn import_comment(&self, issue_id: &str, comment: &Comment) -> Result<()>;

    fn set_metadata(&self, key: &str, value: &str) -> Result<()>;
    fn get_metadata(&self, key: &str) -> Result<Option<String>>;

    fn record_event(
        &self,
        issue_id: &str,
        event_type: &EventType,
        actor: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()>;

    /// Records (or refreshes) a tombstone row.
    fn apply_tombstone(&self, tombstone: &Tombstone) -> Result<()>;

    /// Drops a tombstone (e.g., after a resurrection).
    fn remove_tombstone(&self, id: &str) -> Result<()>;

    fn mark_dirty(&self, id: &str) -> Result<()>;

    /// Returns every live issue id.
    fn all_ids(&self) -> Result<Vec<String>>;

    /// Rebuilds the blocked cache from the current graph. Must run before
    /// commit in any transaction that touched blocking edges or statuses.
    fn rebuild_blocked_cache(&self) -> Result<()>;
}
