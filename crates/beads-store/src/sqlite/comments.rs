//! Comment operations for [`SqliteStore`].
//!
//! Comments are append-only per issue; the per-issue `idx` column is the
//! cross-machine identity used by the merge engine.

use chrono::Utc;
use rusqlite::{Connection, params};

use beads_core::comment::Comment;
use beads_core::enums::EventType;

use crate::error::{Result, StorageError};
use crate::sqlite::dirty::mark_dirty_on_conn;
use crate::sqlite::issues::{
    emit_event, format_datetime, get_issue_on_conn, parse_datetime, refresh_content_hash,
    touch_issue,
};
use crate::sqlite::store::SqliteStore;

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

/// Appends a comment at the next free index and emits a "commented" event.
pub(crate) fn add_comment_on_conn(
    conn: &Connection,
    issue_id: &str,
    author: &str,
    text: &str,
) -> Result<Comment> {
    if text.is_empty() {
        return Err(StorageError::validation("comments", "comment text is required"));
    }
    let issue = get_issue_on_conn(conn, issue_id)?;
    let now = Utc::now();
    let now_str = format_datetime(&now);

    let next_idx: i32 = conn.query_row(
        "SELECT COALESCE(MAX(idx) + 1, 0) FROM comments WHERE issue_id = ?1",
        params![issue.id],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT INTO comments (issue_id, idx, author, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![issue.id, next_idx, author, text, now_str],
    )?;
    let id = conn.last_insert_rowid();

    emit_event(
        conn,
        &issue.id,
        &EventType::Commented,
        author,
        None,
        None,
        &now_str,
    )?;
    touch_issue(conn, &issue.id, &now_str)?;
    refresh_content_hash(conn, &issue.id)?;
    mark_dirty_on_conn(conn, &issue.id)?;

    Ok(Comment {
        id,
        issue_id: issue.id,
        index: next_idx,
        author: author.to_owned(),
        text: text.to_owned(),
        created_at: now,
    })
}

/// Inserts a comment row with an explicit index and timestamp (import
/// path; no event, no dirty marking).
pub(crate) fn insert_comment_row(
    conn: &Connection,
    issue_id: &str,
    comment: &Comment,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO comments (issue_id, idx, author, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            issue_id,
            comment.index,
            comment.author,
            comment.text,
            format_datetime(&comment.created_at),
        ],
    )?;
    Ok(())
}

/// Returns all comments for an issue, ordered by index.
pub(crate) fn get_comments_on_conn(conn: &Connection, issue_id: &str) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, issue_id, idx, author, text, created_at
         FROM comments WHERE issue_id = ?1 ORDER BY idx",
    )?;
    let rows = stmt.query_map(params![issue_id], |row| {
        Ok(Comment {
            id: row.get("id")?,
            issue_id: row.get("issue_id")?,
            index: row.get("idx")?,
            author: row.get("author")?,
            text: row.get("text")?,
            created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        })
    })?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row?);
    }
    Ok(comments)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn add_comment_impl(&self, issue_id: &str, author: &str, text: &str) -> Result<Comment> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        let comment = add_comment_on_conn(&tx, issue_id, author, text)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(comment)
    }

    pub fn get_comments_impl(&self, issue_id: &str) -> Result<Vec<Comment>> {
        let conn = self.lock_conn()?;
        get_comments_on_conn(&conn, issue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let issue = IssueBuilder::new("Commented").id("bd-com1").build();
        store.create_issue_impl(&issue, "alice").unwrap();
        store
    }

    #[test]
    fn add_comment_assigns_indexes() {
        let store = test_store();
        let c0 = store.add_comment_impl("bd-com1", "alice", "first").unwrap();
        let c1 = store.add_comment_impl("bd-com1", "bob", "second").unwrap();
        assert_eq!(c0.index, 0);
        assert_eq!(c1.index, 1);

        let comments = store.get_comments_impl("bd-com1").unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "first");
        assert_eq!(comments[1].text, "second");
    }

    #[test]
    fn empty_comment_rejected() {
        let store = test_store();
        let err = store.add_comment_impl("bd-com1", "alice", "").unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));
    }

    #[test]
    fn comment_on_missing_issue_fails() {
        let store = test_store();
        let err = store.add_comment_impl("bd-nope", "alice", "hi").unwrap_err();
        assert!(err.is_not_found());
    }
}
