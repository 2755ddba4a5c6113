//! Transaction wrapper for [`SqliteStore`].

use rusqlite::Connection;

use beads_core::comment::Comment;
use beads_core::dependency::Dependency;
use beads_core::enums::EventType;
use beads_core::issue::Issue;
use beads_core::tombstone::Tombstone;

use crate::error::{Result, StorageError};
use crate::sqlite::blocked_cache;
use crate::sqlite::comments;
use crate::sqlite::config;
use crate::sqlite::dependencies;
use crate::sqlite::dirty;
use crate::sqlite::issues;
use crate::sqlite::labels;
use crate::sqlite::store::SqliteStore;
use crate::sqlite::tombstones;
use crate::traits::Transaction;

/// A thin wrapper around a SQLite connection that is inside a transaction.
///
/// Delegates to the same connection-level helpers used by [`SqliteStore`],
/// minus the per-operation blocked-cache rebuild: batch callers rebuild
/// once via [`Transaction::rebuild_blocked_cache`] before committing.
pub(crate) struct SqliteTx<'a> {
    pub(crate) conn: &'a Connection,
}

impl Transaction for SqliteTx<'_> {
    fn create_issue(&self, issue: &Issue, actor: &str) -> Result<()> {
        issues::insert_issue(self.conn, issue, actor)
    }

    fn upsert_issue(&self, issue: &Issue, actor: &str) -> Result<bool> {
        issues::upsert_issue_on_conn(self.conn, issue, actor)
    }

    fn get_issue(&self, id: &str) -> Result<Issue> {
        issues::get_issue_on_conn(self.conn, id)
    }

    fn delete_issue_row(&self, id: &str) -> Result<()> {
        issues::delete_issue_row_on_conn(self.conn, id)
    }

    fn add_dependency(&self, dep: &Dependency, actor: &str) -> Result<()> {
        dependencies::add_dependency_on_conn(self.conn, dep, actor)
    }

    fn add_label(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        labels::add_label_on_conn(self.conn, issue_id, label, actor)
    }

    fn import_comment(&self, issue_id: &str, comment: &Comment) -> Result<()> {
        comments::insert_comment_row(self.conn, issue_id, comment)
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        config::set_metadata_on_conn(self.conn, key, value)
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        config::get_metadata_on_conn(self.conn, key)
    }

    fn record_event(
        &self,
        issue_id: &str,
        event_type: &EventType,
        actor: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()> {
        let now_str = issues::format_datetime(&chrono::Utc::now());
        issues::emit_event(
            self.conn, issue_id, event_type, actor, old_value, new_value, &now_str,
        )
    }

    fn apply_tombstone(&self, tombstone: &Tombstone) -> Result<()> {
        tombstones::insert_tombstone_on_conn(self.conn, tombstone)
    }

    fn remove_tombstone(&self, id: &str) -> Result<()> {
        tombstones::remove_tombstone_on_conn(self.conn, id)
    }

    fn mark_dirty(&self, id: &str) -> Result<()> {
        dirty::mark_dirty_on_conn(self.conn, id)
    }

    fn all_ids(&self) -> Result<Vec<String>> {
        issues::all_ids_on_conn(self.conn)
    }

    fn rebuild_blocked_cache(&self) -> Result<()> {
        blocked_cache::rebuild_blocked_cache_on_conn(self.conn)
    }
}

// ---------------------------------------------------------------------------
// SqliteStore::run_in_transaction
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Runs a closure inside a database transaction.
    pub fn run_in_transaction_impl(
        &self,
        f: &dyn Fn(&dyn Transaction) -> Result<()>,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;

        let sqlite_tx = SqliteTx { conn: &tx };
        match f(&sqlite_tx) {
            Ok(()) => {
                tx.commit()
                    .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
                Ok(())
            }
            // Transaction is rolled back on drop.
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::enums::DependencyType;
    use beads_core::issue::IssueBuilder;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn transaction_commit() {
        let store = test_store();

        store
            .run_in_transaction_impl(&|tx| {
                let issue = IssueBuilder::new("In transaction").id("bd-tx1").build();
                tx.create_issue(&issue, "alice")?;
                tx.add_label("bd-tx1", "transacted", "alice")?;
                tx.rebuild_blocked_cache()?;
                Ok(())
            })
            .unwrap();

        let issue = store.get_issue_impl("bd-tx1").unwrap();
        assert_eq!(issue.title, "In transaction");
        let labels = store.get_labels_impl("bd-tx1").unwrap();
        assert_eq!(labels, vec!["transacted"]);
    }

    #[test]
    fn transaction_rollback_on_error() {
        let store = test_store();

        let result = store.run_in_transaction_impl(&|tx| {
            let issue = IssueBuilder::new("Should rollback").id("bd-tx2").build();
            tx.create_issue(&issue, "alice")?;
            Err(StorageError::Transaction("test rollback".into()))
        });

        assert!(result.is_err());
        let err = store.get_issue_impl("bd-tx2").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn transaction_with_dependencies_and_cache() {
        let store = test_store();

        store
            .run_in_transaction_impl(&|tx| {
                let blocker = IssueBuilder::new("Blocker").id("bd-txb").build();
                let blocked = IssueBuilder::new("Blocked").id("bd-txc").build();
                tx.create_issue(&blocker, "alice")?;
                tx.create_issue(&blocked, "alice")?;
                tx.add_dependency(
                    &Dependency::new("bd-txc", "bd-txb", DependencyType::Blocks),
                    "alice",
                )?;
                tx.rebuild_blocked_cache()?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.get_blocked_ids_impl().unwrap(), vec!["bd-txc"]);
    }
}
