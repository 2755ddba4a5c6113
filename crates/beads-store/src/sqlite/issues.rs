//! Issue CRUD operations for [`SqliteStore`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};

use beads_core::content_hash::compute_content_hash;
use beads_core::enums::{EventType, IssueType, Status};
use beads_core::filter::IssueFilter;
use beads_core::issue::Issue;
use beads_core::tombstone::Tombstone;
use beads_core::validation;

use crate::error::{Result, StorageError};
use crate::sqlite::blocked_cache::rebuild_blocked_cache_on_conn;
use crate::sqlite::comments::{get_comments_on_conn, insert_comment_row};
use crate::sqlite::dependencies::get_dependency_records_on_conn;
use crate::sqlite::dirty::mark_dirty_on_conn;
use crate::sqlite::labels::get_labels_on_conn;
use crate::sqlite::store::SqliteStore;
use crate::sqlite::tombstones::insert_tombstone_on_conn;
use crate::traits::IssueUpdates;

// ---------------------------------------------------------------------------
// Column list (shared between INSERT and SELECT)
// ---------------------------------------------------------------------------

/// All issue columns in a deterministic order for SELECT queries.
pub(crate) const ISSUE_COLUMNS: &str = r#"
    id, content_hash, title, description, spec_id,
    status, priority, issue_type, assignee,
    created_at, created_by, updated_at, closed_at, close_reason,
    ephemeral, is_template, await_type, await_id,
    source_repo, external_ref, metadata, extra
"#;

/// Same as [`ISSUE_COLUMNS`] but prefixed with `issues.` for JOIN queries
/// where column names would otherwise be ambiguous.
pub(crate) const ISSUE_COLUMNS_PREFIXED: &str = r#"
    issues.id, issues.content_hash, issues.title, issues.description, issues.spec_id,
    issues.status, issues.priority, issues.issue_type, issues.assignee,
    issues.created_at, issues.created_by, issues.updated_at, issues.closed_at, issues.close_reason,
    issues.ephemeral, issues.is_template, issues.await_type, issues.await_id,
    issues.source_repo, issues.external_ref, issues.metadata, issues.extra
"#;

// ---------------------------------------------------------------------------
// Row scanning
// ---------------------------------------------------------------------------

/// Deserialises a row into an [`Issue`].
///
/// The column order MUST match [`ISSUE_COLUMNS`].
pub(crate) fn scan_issue(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let id: String = row.get("id")?;
    let content_hash: String = row.get("content_hash")?;
    let title: String = row.get("title")?;
    let description: String = row.get("description")?;
    let spec_id: String = row.get("spec_id")?;

    let status_str: String = row.get("status")?;
    let priority: i32 = row.get("priority")?;
    let issue_type_str: String = row.get("issue_type")?;
    let assignee: String = row.get("assignee")?;

    let created_at_str: String = row.get("created_at")?;
    let created_by: String = row.get("created_by")?;
    let updated_at_str: String = row.get("updated_at")?;
    let closed_at_str: Option<String> = row.get("closed_at")?;
    let close_reason: String = row.get("close_reason")?;

    let ephemeral_int: i32 = row.get("ephemeral")?;
    let is_template_int: i32 = row.get("is_template")?;
    let await_type: String = row.get("await_type")?;
    let await_id: String = row.get("await_id")?;

    let source_repo: String = row.get("source_repo")?;
    let external_ref: Option<String> = row.get("external_ref")?;
    let metadata_str: Option<String> = row.get("metadata")?;
    let extra_str: String = row.get("extra")?;

    let metadata = metadata_str
        .filter(|s| !s.is_empty())
        .and_then(|s| serde_json::from_str(&s).ok());
    let extra: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&extra_str).unwrap_or_default();

    Ok(Issue {
        id,
        content_hash,
        title,
        description,
        spec_id,
        status: Status::from(status_str),
        priority,
        issue_type: IssueType::from(issue_type_str),
        assignee,
        created_at: parse_datetime(&created_at_str),
        created_by,
        updated_at: parse_datetime(&updated_at_str),
        closed_at: closed_at_str.as_deref().map(parse_datetime),
        close_reason,
        ephemeral: ephemeral_int != 0,
        is_template: is_template_int != 0,
        await_type,
        await_id,
        source_repo,
        external_ref,
        metadata,
        // Relational fields are hydrated separately.
        labels: Vec::new(),
        dependencies: Vec::new(),
        comments: Vec::new(),
        tombstone: false,
        deleted_at: None,
        deleted_by: String::new(),
        extra,
    })
}

// ---------------------------------------------------------------------------
// Datetime helpers
// ---------------------------------------------------------------------------

/// Formats a `DateTime<Utc>` as ISO 8601 TEXT for SQLite.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parses an ISO 8601 TEXT string from SQLite into a `DateTime<Utc>`.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>().unwrap_or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ"))
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
            .map(|ndt| ndt.and_utc())
            .unwrap_or_else(|_| Utc::now())
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers (shared between store and transaction)
// ---------------------------------------------------------------------------

/// Inserts a single issue row and emits a "created" event.
pub(crate) fn insert_issue(conn: &Connection, issue: &Issue, actor: &str) -> Result<()> {
    let now_str = format_datetime(&Utc::now());
    let content_hash = compute_content_hash(issue);

    let metadata_str = issue.metadata.as_ref().map(|m| m.to_string());
    let extra_str = serde_json::to_string(&issue.extra)?;

    let inserted = conn.execute(
        &format!(
            "INSERT OR IGNORE INTO issues ({ISSUE_COLUMNS}) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18,
                ?19, ?20, ?21, ?22
            )"
        ),
        params![
            issue.id,                                      // 1
            content_hash,                                  // 2
            issue.title,                                   // 3
            issue.description,                             // 4
            issue.spec_id,                                 // 5
            issue.status.as_str(),                         // 6
            issue.priority,                                // 7
            issue.issue_type.as_str(),                     // 8
            issue.assignee,                                // 9
            format_datetime(&issue.created_at),            // 10
            issue.created_by,                              // 11
            format_datetime(&issue.updated_at),            // 12
            issue.closed_at.as_ref().map(format_datetime), // 13
            issue.close_reason,                            // 14
            issue.ephemeral as i32,                        // 15
            issue.is_template as i32,                      // 16
            issue.await_type,                              // 17
            issue.await_id,                                // 18
            issue.source_repo,                             // 19
            issue.external_ref,                            // 20
            metadata_str,                                  // 21
            extra_str,                                     // 22
        ],
    )?;
    if inserted == 0 {
        return Err(StorageError::already_exists("issue", &issue.id));
    }

    emit_event(
        conn,
        &issue.id,
        &EventType::Created,
        actor,
        None,
        None,
        &now_str,
    )?;

    Ok(())
}

/// Emits an event row into the events table.
pub(crate) fn emit_event(
    conn: &Connection,
    issue_id: &str,
    event_type: &EventType,
    actor: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    created_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO events (issue_id, event_type, actor, old_value, new_value, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            issue_id,
            event_type.as_str(),
            actor,
            old_value,
            new_value,
            created_at,
        ],
    )?;
    Ok(())
}

/// Retrieves a single issue by ID. Falls back to a case-insensitive match
/// so display forms resolve; storage itself remains case-sensitive.
pub(crate) fn get_issue_on_conn(conn: &Connection, id: &str) -> Result<Issue> {
    let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1");
    match conn.query_row(&sql, params![id], scan_issue) {
        Ok(issue) => Ok(issue),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            let sql = format!(
                "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1 COLLATE NOCASE LIMIT 1"
            );
            conn.query_row(&sql, params![id], scan_issue)
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("issue", id),
                    other => StorageError::Query(other),
                })
        }
        Err(other) => Err(StorageError::Query(other)),
    }
}

/// Retrieves an issue with labels, dependencies, and comments attached.
pub(crate) fn get_issue_hydrated_on_conn(conn: &Connection, id: &str) -> Result<Issue> {
    let mut issue = get_issue_on_conn(conn, id)?;
    hydrate_issue_on_conn(conn, &mut issue)?;
    Ok(issue)
}

/// Fills the relational fields of an already-scanned issue.
pub(crate) fn hydrate_issue_on_conn(conn: &Connection, issue: &mut Issue) -> Result<()> {
    issue.labels = get_labels_on_conn(conn, &issue.id)?;
    issue.dependencies = get_dependency_records_on_conn(conn, &issue.id)?;
    issue.comments = get_comments_on_conn(conn, &issue.id)?;
    Ok(())
}

/// Recomputes and stores the content hash after relational changes.
pub(crate) fn refresh_content_hash(conn: &Connection, id: &str) -> Result<()> {
    let issue = get_issue_hydrated_on_conn(conn, id)?;
    conn.execute(
        "UPDATE issues SET content_hash = ?1 WHERE id = ?2",
        params![compute_content_hash(&issue), id],
    )?;
    Ok(())
}

/// Bumps `updated_at` on an issue.
pub(crate) fn touch_issue(conn: &Connection, id: &str, now_str: &str) -> Result<()> {
    conn.execute(
        "UPDATE issues SET updated_at = ?1 WHERE id = ?2",
        params![now_str, id],
    )?;
    Ok(())
}

/// Applies partial updates on the given connection.
pub(crate) fn update_issue_on_conn(
    conn: &Connection,
    id: &str,
    updates: &IssueUpdates,
    actor: &str,
) -> Result<()> {
    if updates.is_empty() {
        return Ok(());
    }

    let before = get_issue_on_conn(conn, id)?;
    let now = Utc::now();
    let now_str = format_datetime(&now);

    if let Some(ref title) = updates.title {
        if title.is_empty() {
            return Err(StorageError::validation("title", "title is required"));
        }
    }
    if let Some(priority) = updates.priority {
        if !(0..=4).contains(&priority) {
            return Err(StorageError::validation(
                "priority",
                format!("priority must be between 0 and 4 (got {priority})"),
            ));
        }
    }

    // Build SET clause dynamically from non-None fields.
    let mut set_clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    macro_rules! add_field {
        ($field:ident, $col:expr) => {
            if let Some(ref val) = updates.$field {
                set_clauses.push(format!("{} = ?", $col));
                param_values.push(Box::new(val.clone()));
            }
        };
    }

    add_field!(title, "title");
    add_field!(description, "description");
    add_field!(spec_id, "spec_id");
    add_field!(assignee, "assignee");
    add_field!(close_reason, "close_reason");
    add_field!(await_type, "await_type");
    add_field!(await_id, "await_id");

    if let Some(ref status) = updates.status {
        set_clauses.push("status = ?".to_string());
        param_values.push(Box::new(status.as_str().to_string()));

        // Maintain the closed_at invariant for status flips that bypass
        // close_issue / reopen_issue.
        if *status == Status::Closed && before.closed_at.is_none() {
            set_clauses.push("closed_at = ?".to_string());
            param_values.push(Box::new(now_str.clone()));
        } else if *status != Status::Closed && before.closed_at.is_some() {
            set_clauses.push("closed_at = NULL".to_string());
        }
    }
    if let Some(ref issue_type) = updates.issue_type {
        set_clauses.push("issue_type = ?".to_string());
        param_values.push(Box::new(issue_type.as_str().to_string()));
    }
    if let Some(priority) = updates.priority {
        set_clauses.push("priority = ?".to_string());
        param_values.push(Box::new(priority));
    }
    if let Some(ephemeral) = updates.ephemeral {
        set_clauses.push("ephemeral = ?".to_string());
        param_values.push(Box::new(ephemeral as i32));
    }
    if let Some(is_template) = updates.is_template {
        set_clauses.push("is_template = ?".to_string());
        param_values.push(Box::new(is_template as i32));
    }

    // Double-option fields: outer Some means "update", inner is the value.
    if let Some(ref ext) = updates.external_ref {
        set_clauses.push("external_ref = ?".to_string());
        param_values.push(Box::new(ext.clone()));
    }
    if let Some(ref meta) = updates.metadata {
        set_clauses.push("metadata = ?".to_string());
        param_values.push(Box::new(meta.as_ref().map(|m| m.to_string())));
    }

    set_clauses.push("updated_at = ?".to_string());
    param_values.push(Box::new(now_str.clone()));

    let sql = format!("UPDATE issues SET {} WHERE id = ?", set_clauses.join(", "));
    param_values.push(Box::new(before.id.clone()));

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    conn.execute(&sql, param_refs.as_slice())?;

    // Status changes get a dedicated event with old/new values.
    match updates.status {
        Some(ref status) if *status != before.status => {
            emit_event(
                conn,
                &before.id,
                &EventType::StatusChanged,
                actor,
                Some(before.status.as_str()),
                Some(status.as_str()),
                &now_str,
            )?;
        }
        _ => {
            emit_event(conn, &before.id, &EventType::Updated, actor, None, None, &now_str)?;
        }
    }

    refresh_content_hash(conn, &before.id)?;
    mark_dirty_on_conn(conn, &before.id)?;
    if updates.status.is_some() {
        rebuild_blocked_cache_on_conn(conn)?;
    }

    Ok(())
}

/// Closes an issue on the given connection.
pub(crate) fn close_issue_on_conn(
    conn: &Connection,
    id: &str,
    reason: &str,
    actor: &str,
) -> Result<()> {
    let before = get_issue_on_conn(conn, id)?;
    let now_str = format_datetime(&Utc::now());

    conn.execute(
        "UPDATE issues SET status = 'closed', closed_at = ?1, close_reason = ?2,
         updated_at = ?1 WHERE id = ?3",
        params![now_str, reason, before.id],
    )?;

    emit_event(
        conn,
        &before.id,
        &EventType::Closed,
        actor,
        Some(before.status.as_str()),
        Some(reason),
        &now_str,
    )?;

    refresh_content_hash(conn, &before.id)?;
    mark_dirty_on_conn(conn, &before.id)?;
    rebuild_blocked_cache_on_conn(conn)?;
    Ok(())
}

/// Reopens a closed issue on the given connection.
pub(crate) fn reopen_issue_on_conn(conn: &Connection, id: &str, actor: &str) -> Result<()> {
    let before = get_issue_on_conn(conn, id)?;
    if before.status != Status::Closed {
        return Err(StorageError::validation(
            "status",
            format!("issue {} is not closed", before.id),
        ));
    }
    let now_str = format_datetime(&Utc::now());

    conn.execute(
        "UPDATE issues SET status = 'open', closed_at = NULL, close_reason = '',
         updated_at = ?1 WHERE id = ?2",
        params![now_str, before.id],
    )?;

    emit_event(
        conn,
        &before.id,
        &EventType::Reopened,
        actor,
        Some("closed"),
        Some("open"),
        &now_str,
    )?;

    refresh_content_hash(conn, &before.id)?;
    mark_dirty_on_conn(conn, &before.id)?;
    rebuild_blocked_cache_on_conn(conn)?;
    Ok(())
}

/// Deletes an issue, leaving a tombstone. Related rows cascade.
pub(crate) fn delete_issue_on_conn(conn: &Connection, id: &str, actor: &str) -> Result<()> {
    let before = get_issue_on_conn(conn, id)?;
    let tombstone = Tombstone::new(&before.id, actor);
    let now_str = format_datetime(&tombstone.deleted_at);

    conn.execute("DELETE FROM issues WHERE id = ?1", params![before.id])?;
    insert_tombstone_on_conn(conn, &tombstone)?;

    emit_event(conn, &before.id, &EventType::Deleted, actor, None, None, &now_str)?;

    // The tombstone itself must be exported, so the id stays dirty.
    mark_dirty_on_conn(conn, &before.id)?;
    rebuild_blocked_cache_on_conn(conn)?;
    Ok(())
}

/// Removes an issue row without a tombstone (sync-internal).
pub(crate) fn delete_issue_row_on_conn(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM issues WHERE id = ?1", params![id])?;
    Ok(())
}

/// Gives an issue a fresh id and rewrites all edges. The old id gets a
/// tombstone so the rename propagates through sync as delete + create.
pub(crate) fn rename_issue_on_conn(
    conn: &Connection,
    old_id: &str,
    new_id: &str,
    actor: &str,
) -> Result<()> {
    validation::validate_id(new_id).map_err(StorageError::from)?;
    let before = get_issue_on_conn(conn, old_id)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM issues WHERE id = ?1)",
        params![new_id],
        |row| row.get(0),
    )?;
    if exists {
        return Err(StorageError::already_exists("issue", new_id));
    }

    let now_str = format_datetime(&Utc::now());

    // Child rows holding issue_id follow via ON UPDATE CASCADE; only the
    // un-keyed depends_on_id column needs an explicit rewrite.
    conn.execute(
        "UPDATE issues SET id = ?1, updated_at = ?2 WHERE id = ?3",
        params![new_id, now_str, before.id],
    )?;
    conn.execute(
        "UPDATE dependencies SET depends_on_id = ?1 WHERE depends_on_id = ?2",
        params![new_id, before.id],
    )?;

    // The old id disappears from the journal via a tombstone; the new id
    // exports as a fresh record.
    insert_tombstone_on_conn(conn, &Tombstone::new(&before.id, actor))?;
    emit_event(
        conn,
        new_id,
        &EventType::Renamed,
        actor,
        Some(&before.id),
        Some(new_id),
        &now_str,
    )?;

    mark_dirty_on_conn(conn, &before.id)?;
    mark_dirty_on_conn(conn, new_id)?;
    rebuild_blocked_cache_on_conn(conn)?;
    Ok(())
}

/// Inserts or fully replaces an issue from a hydrated record (import
/// path). Returns `true` if anything changed.
pub(crate) fn upsert_issue_on_conn(conn: &Connection, issue: &Issue, actor: &str) -> Result<bool> {
    let incoming_hash = compute_content_hash(issue);

    match get_issue_hydrated_on_conn(conn, &issue.id) {
        Ok(existing) => {
            let unchanged = existing.content_hash == incoming_hash
                && existing.created_at == issue.created_at
                && existing.updated_at == issue.updated_at
                && existing.closed_at == issue.closed_at;
            if unchanged {
                return Ok(false);
            }

            let metadata_str = issue.metadata.as_ref().map(|m| m.to_string());
            let extra_str = serde_json::to_string(&issue.extra)?;
            conn.execute(
                "UPDATE issues SET
                    content_hash = ?2, title = ?3, description = ?4, spec_id = ?5,
                    status = ?6, priority = ?7, issue_type = ?8, assignee = ?9,
                    created_at = ?10, created_by = ?11, updated_at = ?12,
                    closed_at = ?13, close_reason = ?14,
                    ephemeral = ?15, is_template = ?16, await_type = ?17, await_id = ?18,
                    source_repo = ?19, external_ref = ?20, metadata = ?21, extra = ?22
                 WHERE id = ?1",
                params![
                    issue.id,
                    incoming_hash,
                    issue.title,
                    issue.description,
                    issue.spec_id,
                    issue.status.as_str(),
                    issue.priority,
                    issue.issue_type.as_str(),
                    issue.assignee,
                    format_datetime(&issue.created_at),
                    issue.created_by,
                    format_datetime(&issue.updated_at),
                    issue.closed_at.as_ref().map(format_datetime),
                    issue.close_reason,
                    issue.ephemeral as i32,
                    issue.is_template as i32,
                    issue.await_type,
                    issue.await_id,
                    issue.source_repo,
                    issue.external_ref,
                    metadata_str,
                    extra_str,
                ],
            )?;
            replace_relational_rows(conn, issue)?;
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            insert_issue(conn, issue, actor)?;
            replace_relational_rows(conn, issue)?;
            refresh_content_hash(conn, &issue.id)?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Replaces labels, dependencies, and comments from a hydrated record.
fn replace_relational_rows(conn: &Connection, issue: &Issue) -> Result<()> {
    conn.execute("DELETE FROM labels WHERE issue_id = ?1", params![issue.id])?;
    for label in &issue.labels {
        conn.execute(
            "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2)",
            params![issue.id, label],
        )?;
    }

    conn.execute(
        "DELETE FROM dependencies WHERE issue_id = ?1",
        params![issue.id],
    )?;
    for dep in &issue.dependencies {
        conn.execute(
            "INSERT OR REPLACE INTO dependencies
             (issue_id, depends_on_id, type, created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                issue.id,
                dep.depends_on_id,
                dep.dep_type.as_str(),
                format_datetime(&dep.created_at),
                dep.created_by,
            ],
        )?;
    }

    conn.execute(
        "DELETE FROM comments WHERE issue_id = ?1",
        params![issue.id],
    )?;
    for comment in &issue.comments {
        insert_comment_row(conn, &issue.id, comment)?;
    }

    Ok(())
}

/// Returns every live issue id.
pub(crate) fn all_ids_on_conn(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM issues ORDER BY id")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Lists issues matching the filter.
pub(crate) fn list_issues_on_conn(conn: &Connection, filter: &IssueFilter) -> Result<Vec<Issue>> {
    let mut where_clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut param_idx = 1;

    macro_rules! push_clause {
        ($clause:expr, $value:expr) => {
            where_clauses.push(format!($clause, param_idx));
            param_values.push(Box::new($value));
            param_idx += 1;
        };
    }

    if let Some(ref status) = filter.status {
        push_clause!("status = ?{}", status.as_str().to_string());
    }
    if let Some(priority) = filter.priority {
        push_clause!("priority = ?{}", priority);
    }
    if let Some(ref issue_type) = filter.issue_type {
        push_clause!("issue_type = ?{}", issue_type.as_str().to_string());
    }
    if let Some(ref assignee) = filter.assignee {
        push_clause!("assignee = ?{}", assignee.clone());
    }
    if let Some(ref title_contains) = filter.title_contains {
        push_clause!("title LIKE ?{}", format!("%{title_contains}%"));
    }
    if let Some(ref desc_contains) = filter.description_contains {
        push_clause!("description LIKE ?{}", format!("%{desc_contains}%"));
    }
    if let Some(ref created_after) = filter.created_after {
        push_clause!("created_at >= ?{}", format_datetime(created_after));
    }
    if let Some(ref created_before) = filter.created_before {
        push_clause!("created_at <= ?{}", format_datetime(created_before));
    }
    if let Some(ref updated_after) = filter.updated_after {
        push_clause!("updated_at >= ?{}", format_datetime(updated_after));
    }
    if let Some(ref updated_before) = filter.updated_before {
        push_clause!("updated_at <= ?{}", format_datetime(updated_before));
    }
    if let Some(ref id_prefix) = filter.id_prefix {
        push_clause!("id LIKE ?{}", format!("{id_prefix}%"));
    }
    if let Some(ref spec_prefix) = filter.spec_id_prefix {
        push_clause!("spec_id LIKE ?{}", format!("{spec_prefix}%"));
    }
    if let Some(ref source_repo) = filter.source_repo {
        push_clause!("source_repo = ?{}", source_repo.clone());
    }
    if filter.no_assignee {
        where_clauses.push("(assignee IS NULL OR assignee = '')".to_string());
    }
    if filter.no_labels {
        where_clauses
            .push("NOT EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = issues.id)".to_string());
    }
    for status in &filter.exclude_status {
        push_clause!("status != ?{}", status.as_str().to_string());
    }
    if let Some(ref parent_id) = filter.parent_id {
        where_clauses.push(format!(
            "EXISTS (SELECT 1 FROM dependencies d WHERE d.issue_id = issues.id
              AND d.type = 'parent-child' AND d.depends_on_id = ?{param_idx})"
        ));
        param_values.push(Box::new(parent_id.clone()));
        param_idx += 1;
    }

    if !filter.ids.is_empty() {
        let placeholders: Vec<String> = filter
            .ids
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", param_idx + i))
            .collect();
        where_clauses.push(format!("id IN ({})", placeholders.join(",")));
        for id in &filter.ids {
            param_values.push(Box::new(id.clone()));
        }
        param_idx += filter.ids.len();
    }

    // Labels AND.
    for label in &filter.labels {
        where_clauses.push(format!(
            "EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = issues.id AND labels.label = ?{param_idx})"
        ));
        param_values.push(Box::new(label.clone()));
        param_idx += 1;
    }

    // Labels OR.
    if !filter.labels_any.is_empty() {
        let placeholders: Vec<String> = filter
            .labels_any
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", param_idx + i))
            .collect();
        where_clauses.push(format!(
            "EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = issues.id AND labels.label IN ({}))",
            placeholders.join(",")
        ));
        for label in &filter.labels_any {
            param_values.push(Box::new(label.clone()));
        }
        param_idx += filter.labels_any.len();
    }

    let where_sql = if where_clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_clauses.join(" AND "))
    };
    let limit_sql = filter
        .limit
        .map(|l| format!(" LIMIT {l}"))
        .unwrap_or_default();

    let sql = format!(
        "SELECT {ISSUE_COLUMNS} FROM issues {where_sql} ORDER BY created_at DESC{limit_sql}"
    );

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), scan_issue)?;

    let mut issues = Vec::new();
    for row in rows {
        issues.push(row?);
    }

    let _ = param_idx;
    Ok(issues)
}

// ---------------------------------------------------------------------------
// SqliteStore issue methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Creates a single issue transactionally.
    pub fn create_issue_impl(&self, issue: &Issue, actor: &str) -> Result<()> {
        validation::validate(issue).map_err(StorageError::from)?;
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        insert_issue(&tx, issue, actor)?;
        mark_dirty_on_conn(&tx, &issue.id)?;
        rebuild_blocked_cache_on_conn(&tx)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn get_issue_impl(&self, id: &str) -> Result<Issue> {
        let conn = self.lock_conn()?;
        get_issue_on_conn(&conn, id)
    }

    pub fn get_issue_hydrated_impl(&self, id: &str) -> Result<Issue> {
        let conn = self.lock_conn()?;
        get_issue_hydrated_on_conn(&conn, id)
    }

    pub fn list_issues_impl(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        list_issues_on_conn(&conn, filter)
    }

    pub fn update_issue_impl(&self, id: &str, updates: &IssueUpdates, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        update_issue_on_conn(&tx, id, updates, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn close_issue_impl(&self, id: &str, reason: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        close_issue_on_conn(&tx, id, reason, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn reopen_issue_impl(&self, id: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        reopen_issue_on_conn(&tx, id, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn delete_issue_impl(&self, id: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        delete_issue_on_conn(&tx, id, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn rename_issue_impl(&self, old_id: &str, new_id: &str, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        rename_issue_on_conn(&tx, old_id, new_id, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    /// Returns every live issue, fully hydrated, ordered by id.
    pub fn snapshot_impl(&self) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], scan_issue)?;

        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        for issue in &mut issues {
            hydrate_issue_on_conn(&conn, issue)?;
        }
        Ok(issues)
    }
}
