//! Transactional SQLite storage engine for the beads system.
//!
//! Provides the [`Storage`] trait and its SQLite implementation
//! ([`SqliteStore`]), including the materialized blocked cache, the
//! dirty set, and tombstone persistence.

pub mod error;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience.
pub use error::StorageError;
pub use sqlite::SqliteStore;
pub use sqlite::config::{
    META_EXPORT_HASHES, META_JOURNAL_HASH, META_LAST_IMPORT_HASH, META_LAST_IMPORT_TIME,
};
pub use traits::{BlockedIssue, IssueUpdates, Statistics, Storage, Transaction, TreeNode};

// ---------------------------------------------------------------------------
// Storage trait implementation for SqliteStore
// ---------------------------------------------------------------------------

use beads_core::comment::{Comment, Event};
use beads_core::dependency::Dependency;
use beads_core::enums::{DependencyType, EventType};
use beads_core::filter::{IssueFilter, WorkFilter};
use beads_core::issue::Issue;
use beads_core::tombstone::Tombstone;

use crate::error::Result;

impl Storage for SqliteStore {
    fn create_issue(&self, issue: &Issue, actor: &str) -> Result<()> {
        self.create_issue_impl(issue, actor)
    }

    fn get_issue(&self, id: &str) -> Result<Issue> {
        self.get_issue_impl(id)
    }

    fn get_issue_hydrated(&self, id: &str) -> Result<Issue> {
        self.get_issue_hydrated_impl(id)
    }

    fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        self.list_issues_impl(filter)
    }

    fn update_issue(&self, id: &str, updates: &IssueUpdates, actor: &str) -> Result<()> {
        self.update_issue_impl(id, updates, actor)
    }

    fn close_issue(&self, id: &str, reason: &str, actor: &str) -> Result<()> {
        self.close_issue_impl(id, reason, actor)
    }

    fn reopen_issue(&self, id: &str, actor: &str) -> Result<()> {
        self.reopen_issue_impl(id, actor)
    }

    fn delete_issue(&self, id: &str, actor: &str) -> Result<()> {
        self.delete_issue_impl(id, actor)
    }

    fn rename_issue(&self, old_id: &str, new_id: &str, actor: &str) -> Result<()> {
        self.rename_issue_impl(old_id, new_id, actor)
    }

    fn add_dependency(&self, dep: &Dependency, actor: &str) -> Result<()> {
        self.add_dependency_impl(dep, actor)
    }

    fn remove_dependency(
        &self,
        issue_id: &str,
        depends_on_id: &str,
        dep_type: &DependencyType,
        actor: &str,
    ) -> Result<()> {
        self.remove_dependency_impl(issue_id, depends_on_id, dep_type, actor)
    }

    fn get_dependency_records(&self, issue_id: &str) -> Result<Vec<Dependency>> {
        self.get_dependency_records_impl(issue_id)
    }

    fn get_dependencies(&self, issue_id: &str) -> Result<Vec<Issue>> {
        self.get_dependencies_impl(issue_id)
    }

    fn get_dependents(&self, issue_id: &str) -> Result<Vec<Issue>> {
        self.get_dependents_impl(issue_id)
    }

    fn get_dependency_tree(
        &self,
        issue_id: &str,
        max_depth: i32,
        reverse: bool,
    ) -> Result<Vec<TreeNode>> {
        self.get_dependency_tree_impl(issue_id, max_depth, reverse)
    }

    fn add_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        self.add_label_impl(issue_id, label, actor)
    }

    fn remove_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        self.remove_label_impl(issue_id, label, actor)
    }

    fn get_labels(&self, issue_id: &str) -> Result<Vec<String>> {
        self.get_labels_impl(issue_id)
    }

    fn add_comment(&self, issue_id: &str, author: &str, text: &str) -> Result<Comment> {
        self.add_comment_impl(issue_id, author, text)
    }

    fn get_comments(&self, issue_id: &str) -> Result<Vec<Comment>> {
        self.get_comments_impl(issue_id)
    }

    fn get_events(&self, issue_id: &str, limit: i32) -> Result<Vec<Event>> {
        self.get_events_impl(issue_id, limit)
    }

    fn record_event(
        &self,
        issue_id: &str,
        event_type: &EventType,
        actor: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()> {
        self.record_event_impl(issue_id, event_type, actor, old_value, new_value)
    }

    fn get_ready_work(&self, filter: &WorkFilter) -> Result<Vec<Issue>> {
        self.get_ready_work_impl(filter)
    }

    fn get_blocked_issues(&self, filter: &WorkFilter) -> Result<Vec<BlockedIssue>> {
        self.get_blocked_issues_impl(filter)
    }

    fn get_blocked_ids(&self) -> Result<Vec<String>> {
        self.get_blocked_ids_impl()
    }

    fn get_statistics(&self) -> Result<Statistics> {
        self.get_statistics_impl()
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.set_config_impl(key, value)
    }

    fn get_config(&self, key: &str) -> Result<Option<String>> {
        self.get_config_impl(key)
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.set_metadata_impl(key, value)
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        self.get_metadata_impl(key)
    }

    fn dirty_ids(&self) -> Result<Vec<String>> {
        self.dirty_ids_impl()
    }

    fn mark_dirty(&self, id: &str) -> Result<()> {
        self.mark_dirty_impl(id)
    }

    fn mark_all_dirty(&self) -> Result<()> {
        self.mark_all_dirty_impl()
    }

    fn take_dirty(&self) -> Result<Vec<String>> {
        self.take_dirty_impl()
    }

    fn get_tombstones(&self) -> Result<Vec<Tombstone>> {
        self.get_tombstones_impl()
    }

    fn purge_expired_tombstones(&self, ttl_days: i64) -> Result<usize> {
        self.purge_expired_tombstones_impl(ttl_days)
    }

    fn snapshot(&self) -> Result<Vec<Issue>> {
        self.snapshot_impl()
    }

    fn run_in_transaction(&self, f: &dyn Fn(&dyn Transaction) -> Result<()>) -> Result<()> {
        self.run_in_transaction_impl(f)
    }

    fn is_active(&self) -> bool {
        self.active()
    }

    fn close(&self) -> Result<()> {
        // The connection itself is closed when the store is dropped; the
        // flag makes in-flight callers fail with StoreInactive instead.
        self.deactivate();
        Ok(())
    }
}
