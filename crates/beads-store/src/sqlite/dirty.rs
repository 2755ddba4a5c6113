//! Dirty-set tracking.
//!
//! `dirty_issues` records the ids modified since the last successful
//! export. Mutators insert into it inside their own transaction, so a
//! committed change is always visible to the next flush (happens-before
//! via the transaction commit). The exporter atomically *claims* the set
//! at flush start; a mutation landing mid-export re-inserts its row and
//! stays pending for the next flush, and a failed export puts the
//! claimed ids back.

use rusqlite::{Connection, params};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

pub(crate) fn mark_dirty_on_conn(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO dirty_issues (issue_id) VALUES (?1)",
        params![id],
    )?;
    Ok(())
}

pub(crate) fn dirty_ids_on_conn(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT issue_id FROM dirty_issues ORDER BY issue_id")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

impl SqliteStore {
    pub fn dirty_ids_impl(&self) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        dirty_ids_on_conn(&conn)
    }

    pub fn mark_dirty_impl(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        mark_dirty_on_conn(&conn, id)
    }

    /// Marks every live issue and tombstone dirty.
    pub fn mark_all_dirty_impl(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        tx.execute(
            "INSERT OR IGNORE INTO dirty_issues (issue_id) SELECT id FROM issues",
            [],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO dirty_issues (issue_id) SELECT id FROM tombstones",
            [],
        )?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    /// Claims the current dirty set: reads and deletes it in one
    /// transaction.
    pub fn take_dirty_impl(&self) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        let ids = dirty_ids_on_conn(&tx)?;
        tx.execute("DELETE FROM dirty_issues", [])?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;

    #[test]
    fn mutations_mark_dirty_and_take_claims() {
        let store = SqliteStore::open_in_memory().unwrap();
        let issue = IssueBuilder::new("Dirty").id("bd-dirty1").build();
        store.create_issue_impl(&issue, "t").unwrap();

        assert_eq!(store.dirty_ids_impl().unwrap(), vec!["bd-dirty1"]);

        let taken = store.take_dirty_impl().unwrap();
        assert_eq!(taken, vec!["bd-dirty1"]);
        assert!(store.dirty_ids_impl().unwrap().is_empty());

        // A later mutation re-dirties independently of the claim.
        store.add_label_impl("bd-dirty1", "x", "t").unwrap();
        assert_eq!(store.dirty_ids_impl().unwrap(), vec!["bd-dirty1"]);
    }

    #[test]
    fn mark_all_dirty_covers_tombstones() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = IssueBuilder::new("A").id("bd-ma1").build();
        let b = IssueBuilder::new("B").id("bd-ma2").build();
        store.create_issue_impl(&a, "t").unwrap();
        store.create_issue_impl(&b, "t").unwrap();
        store.delete_issue_impl("bd-ma2", "t").unwrap();
        store.take_dirty_impl().unwrap();

        store.mark_all_dirty_impl().unwrap();
        assert_eq!(store.dirty_ids_impl().unwrap(), vec!["bd-ma1", "bd-ma2"]);
    }

    #[test]
    fn failed_export_can_restore_claimed_ids() {
        let store = SqliteStore::open_in_memory().unwrap();
        let issue = IssueBuilder::new("Restore").id("bd-rs1").build();
        store.create_issue_impl(&issue, "t").unwrap();

        let taken = store.take_dirty_impl().unwrap();
        for id in &taken {
            store.mark_dirty_impl(id).unwrap();
        }
        assert_eq!(store.dirty_ids_impl().unwrap(), vec!["bd-rs1"]);
    }
}
