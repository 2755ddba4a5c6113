//! Tombstone persistence.

use chrono::Utc;
use rusqlite::{Connection, params};

use beads_core::tombstone::Tombstone;

use crate::error::{Result, StorageError};
use crate::sqlite::issues::{format_datetime, parse_datetime};
use crate::sqlite::store::SqliteStore;

pub(crate) fn insert_tombstone_on_conn(conn: &Connection, tombstone: &Tombstone) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO tombstones (id, deleted_at, deleted_by) VALUES (?1, ?2, ?3)",
        params![
            tombstone.id,
            format_datetime(&tombstone.deleted_at),
            tombstone.deleted_by,
        ],
    )?;
    Ok(())
}

pub(crate) fn remove_tombstone_on_conn(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM tombstones WHERE id = ?1", params![id])?;
    Ok(())
}

pub(crate) fn get_tombstones_on_conn(conn: &Connection) -> Result<Vec<Tombstone>> {
    let mut stmt =
        conn.prepare_cached("SELECT id, deleted_at, deleted_by FROM tombstones ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Tombstone {
            id: row.get("id")?,
            deleted_at: parse_datetime(&row.get::<_, String>("deleted_at")?),
            deleted_by: row.get("deleted_by")?,
        })
    })?;

    let mut tombstones = Vec::new();
    for row in rows {
        tombstones.push(row?);
    }
    Ok(tombstones)
}

impl SqliteStore {
    pub fn get_tombstones_impl(&self) -> Result<Vec<Tombstone>> {
        let conn = self.lock_conn()?;
        get_tombstones_on_conn(&conn)
    }

    /// Deletes tombstones whose TTL has elapsed. Their ids also leave the
    /// dirty set (there is nothing left to export).
    pub fn purge_expired_tombstones_impl(&self, ttl_days: i64) -> Result<usize> {
        let now = Utc::now();
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;

        let expired: Vec<String> = {
            let all = get_tombstones_on_conn(&tx)?;
            all.into_iter()
                .filter(|t| t.is_expired(now, ttl_days))
                .map(|t| t.id)
                .collect()
        };

        {
            let mut del_tomb = tx.prepare_cached("DELETE FROM tombstones WHERE id = ?1")?;
            let mut del_dirty =
                tx.prepare_cached("DELETE FROM dirty_issues WHERE issue_id = ?1")?;
            for id in &expired {
                del_tomb.execute(params![id])?;
                del_dirty.execute(params![id])?;
            }
        }

        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;
    use chrono::Duration;

    #[test]
    fn delete_records_tombstone() {
        let store = SqliteStore::open_in_memory().unwrap();
        let issue = IssueBuilder::new("Doomed").id("bd-ts1").build();
        store.create_issue_impl(&issue, "alice").unwrap();
        store.delete_issue_impl("bd-ts1", "alice").unwrap();

        let tombstones = store.get_tombstones_impl().unwrap();
        assert_eq!(tombstones.len(), 1);
        assert_eq!(tombstones[0].id, "bd-ts1");
        assert_eq!(tombstones[0].deleted_by, "alice");
    }

    #[test]
    fn purge_respects_ttl() {
        let store = SqliteStore::open_in_memory().unwrap();
        let issue = IssueBuilder::new("Old").id("bd-ts2").build();
        store.create_issue_impl(&issue, "alice").unwrap();
        store.delete_issue_impl("bd-ts2", "alice").unwrap();

        // Fresh tombstone survives.
        assert_eq!(store.purge_expired_tombstones_impl(30).unwrap(), 0);
        assert_eq!(store.get_tombstones_impl().unwrap().len(), 1);

        // Backdate it past the TTL.
        {
            let conn = store.lock_conn().unwrap();
            let old = Utc::now() - Duration::days(31);
            conn.execute(
                "UPDATE tombstones SET deleted_at = ?1 WHERE id = 'bd-ts2'",
                params![format_datetime(&old)],
            )
            .unwrap();
        }
        assert_eq!(store.purge_expired_tombstones_impl(30).unwrap(), 1);
        assert!(store.get_tombstones_impl().unwrap().is_empty());
        assert!(store.dirty_ids_impl().unwrap().is_empty());
    }
}
