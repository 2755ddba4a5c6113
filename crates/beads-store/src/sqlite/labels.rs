//! Label operations for [`SqliteStore`].

use chrono::Utc;
use rusqlite::{Connection, params};

use beads_core::comment::is_reserved_label;
use beads_core::enums::EventType;

use crate::error::{Result, StorageError};
use crate::sqlite::dirty::mark_dirty_on_conn;
use crate::sqlite::issues::{
    emit_event, format_datetime, get_issue_on_conn, refresh_content_hash, touch_issue,
};
use crate::sqlite::store::SqliteStore;

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

pub(crate) fn add_label_on_conn(
    conn: &Connection,
    issue_id: &str,
    label: &str,
    actor: &str,
) -> Result<()> {
    if label.is_empty() {
        return Err(StorageError::validation("labels", "label is required"));
    }
    if is_reserved_label(label) {
        return Err(StorageError::validation(
            "labels",
            format!("label '{label}' uses a reserved namespace"),
        ));
    }
    let issue = get_issue_on_conn(conn, issue_id)?;
    let now_str = format_datetime(&Utc::now());

    // Labels are a set: re-adding is a no-op, not an error.
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2)",
        params![issue.id, label],
    )?;
    if inserted == 0 {
        return Ok(());
    }

    emit_event(
        conn,
        &issue.id,
        &EventType::LabelAdded,
        actor,
        None,
        Some(label),
        &now_str,
    )?;
    touch_issue(conn, &issue.id, &now_str)?;
    refresh_content_hash(conn, &issue.id)?;
    mark_dirty_on_conn(conn, &issue.id)?;
    Ok(())
}

pub(crate) fn remove_label_on_conn(
    conn: &Connection,
    issue_id: &str,
    label: &str,
    actor: &str,
) -> Result<()> {
    let issue = get_issue_on_conn(conn, issue_id)?;
    let now_str = format_datetime(&Utc::now());

    let affected = conn.execute(
        "DELETE FROM labels WHERE issue_id = ?1 AND label = ?2",
        params![issue.id, label],
    )?;
    if affected == 0 {
        return Err(StorageError::not_found(
            "label",
            format!("{issue_id}: {label}"),
        ));
    }

    emit_event(
        conn,
        &issue.id,
        &EventType::LabelRemoved,
        actor,
        Some(label),
        None,
        &now_str,
    )?;
    touch_issue(conn, &issue.id, &now_str)?;
    refresh_content_hash(conn, &issue.id)?;
    mark_dirty_on_conn(conn, &issue.id)?;
    Ok(())
}

pub(crate) fn get_labels_on_conn(conn: &Connection, issue_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT label FROM labels WHERE issue_id = ?1 ORDER BY label",
    )?;
    let rows = stmt.query_map(params![issue_id], |row| row.get::<_, String>(0))?;
    let mut labels = Vec::new();
    for row in rows {
        labels.push(row?);
    }
    Ok(labels)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn add_label_impl(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        add_label_on_conn(&tx, issue_id, label, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn remove_label_impl(&self, issue_id: &str, label: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        remove_label_on_conn(&tx, issue_id, label, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn get_labels_impl(&self, issue_id: &str) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        get_labels_on_conn(&conn, issue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let issue = IssueBuilder::new("Labeled").id("bd-lab1").build();
        store.create_issue_impl(&issue, "alice").unwrap();
        store
    }

    #[test]
    fn add_and_get_labels() {
        let store = test_store();
        store.add_label_impl("bd-lab1", "backend", "alice").unwrap();
        store.add_label_impl("bd-lab1", "api", "alice").unwrap();

        let labels = store.get_labels_impl("bd-lab1").unwrap();
        assert_eq!(labels, vec!["api", "backend"]);
    }

    #[test]
    fn labels_are_a_set() {
        let store = test_store();
        store.add_label_impl("bd-lab1", "backend", "alice").unwrap();
        store.add_label_impl("bd-lab1", "backend", "alice").unwrap();

        let labels = store.get_labels_impl("bd-lab1").unwrap();
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn labels_case_sensitive() {
        let store = test_store();
        store.add_label_impl("bd-lab1", "Backend", "alice").unwrap();
        store.add_label_impl("bd-lab1", "backend", "alice").unwrap();

        let labels = store.get_labels_impl("bd-lab1").unwrap();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn reserved_namespace_rejected() {
        let store = test_store();
        let err = store.add_label_impl("bd-lab1", "bd:internal", "alice").unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));
        let err = store.add_label_impl("bd-lab1", "_hidden", "alice").unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));
    }

    #[test]
    fn remove_missing_label_fails() {
        let store = test_store();
        let err = store.remove_label_impl("bd-lab1", "nope", "alice").unwrap_err();
        assert!(err.is_not_found());
    }
}
