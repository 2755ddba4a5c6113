//! Work queries: ready work, blocked issues, statistics, events.
//!
//! The ready query is a plain indexed lookup against the materialized
//! blocked cache; it never traverses the dependency graph on the read
//! path.

use rusqlite::params;

use beads_core::comment::Event;
use beads_core::enums::{EventType, SortPolicy};
use beads_core::filter::WorkFilter;
use beads_core::issue::Issue;

use crate::error::Result;
use crate::sqlite::issues::{ISSUE_COLUMNS, emit_event, format_datetime, parse_datetime, scan_issue};
use crate::sqlite::store::SqliteStore;
use crate::traits::{BlockedIssue, Statistics};

impl SqliteStore {
    /// Returns issues that are ready to work on.
    ///
    /// An issue is ready if its status is open or in progress, it is not
    /// in the blocked cache, and it is not a template.
    pub fn get_ready_work_impl(&self, filter: &WorkFilter) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;

        let mut where_clauses: Vec<String> = vec![
            "i.status IN ('open', 'in_progress')".to_string(),
            "i.is_template = 0".to_string(),
            "NOT EXISTS (SELECT 1 FROM blocked_cache c WHERE c.issue_id = i.id)".to_string(),
        ];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut param_idx = 1;

        if !filter.include_ephemeral {
            where_clauses.push("i.ephemeral = 0".to_string());
        }
        if let Some(ref issue_type) = filter.issue_type {
            where_clauses.push(format!("i.issue_type = ?{param_idx}"));
            param_values.push(Box::new(issue_type.as_str().to_string()));
            param_idx += 1;
        }
        if let Some(priority) = filter.priority {
            where_clauses.push(format!("i.priority = ?{param_idx}"));
            param_values.push(Box::new(priority));
            param_idx += 1;
        }
        if let Some(ref assignee) = filter.assignee {
            where_clauses.push(format!("i.assignee = ?{param_idx}"));
            param_values.push(Box::new(assignee.clone()));
            param_idx += 1;
        }
        if filter.unassigned {
            where_clauses.push("(i.assignee IS NULL OR i.assignee = '')".to_string());
        }

        // Label filters (AND).
        for label in &filter.labels {
            where_clauses.push(format!(
                "EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = i.id AND labels.label = ?{param_idx})"
            ));
            param_values.push(Box::new(label.clone()));
            param_idx += 1;
        }

        // Label filters (OR).
        if !filter.labels_any.is_empty() {
            let placeholders: Vec<String> = filter
                .labels_any
                .iter()
                .enumerate()
                .map(|(j, _)| format!("?{}", param_idx + j))
                .collect();
            where_clauses.push(format!(
                "EXISTS (SELECT 1 FROM labels WHERE labels.issue_id = i.id AND labels.label IN ({}))",
                placeholders.join(",")
            ));
            for label in &filter.labels_any {
                param_values.push(Box::new(label.clone()));
            }
            param_idx += filter.labels_any.len();
        }

        let where_sql = where_clauses.join(" AND ");
        let order_sql = match filter.sort_policy {
            SortPolicy::Oldest => "i.created_at ASC",
            // Hybrid and Priority both lead with priority.
            _ => "i.priority ASC, i.created_at ASC",
        };
        let limit_sql = filter
            .limit
            .map(|l| format!(" LIMIT {l}"))
            .unwrap_or_default();

        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i WHERE {where_sql} ORDER BY {order_sql}{limit_sql}"
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

    /// Returns issues currently in the blocked cache, with the count of
    /// their direct active blockers.
    pub fn get_blocked_issues_impl(&self, filter: &WorkFilter) -> Result<Vec<BlockedIssue>> {
        let conn = self.lock_conn()?;

        let mut where_clauses: Vec<String> = vec![
            "EXISTS (SELECT 1 FROM blocked_cache c WHERE c.issue_id = i.id)".to_string(),
        ];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut param_idx = 1;

        if let Some(ref assignee) = filter.assignee {
            where_clauses.push(format!("i.assignee = ?{param_idx}"));
            param_values.push(Box::new(assignee.clone()));
            param_idx += 1;
        }
        if let Some(priority) = filter.priority {
            where_clauses.push(format!("i.priority = ?{param_idx}"));
            param_values.push(Box::new(priority));
            param_idx += 1;
        }

        let where_sql = where_clauses.join(" AND ");
        let limit_sql = filter
            .limit
            .map(|l| format!(" LIMIT {l}"))
            .unwrap_or_default();

        let sql = format!(
            "SELECT {ISSUE_COLUMNS},
                    (SELECT COUNT(*)
                     FROM dependencies d
                     INNER JOIN issues blocker ON blocker.id = d.depends_on_id
                     WHERE d.issue_id = i.id
                       AND d.type = 'blocks'
                       AND blocker.status IN ('open', 'in_progress', 'blocked')
                    ) AS blocked_by_count
             FROM issues i
             WHERE {where_sql}
             ORDER BY i.priority ASC, i.created_at ASC{limit_sql}"
        );

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            let issue = scan_issue(row)?;
            let blocked_by_count: i32 = row.get("blocked_by_count")?;
            Ok(BlockedIssue {
                issue,
                blocked_by_count,
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }

        let _ = param_idx;
        Ok(result)
    }

    /// Returns aggregate statistics.
    pub fn get_statistics_impl(&self) -> Result<Statistics> {
        let conn = self.lock_conn()?;
        let mut stats = Statistics::default();

        let count_by_status = |status: &str| -> Result<i64> {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM issues WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )?)
        };

        stats.total_issues =
            conn.query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
        stats.open_issues = count_by_status("open")?;
        stats.in_progress_issues = count_by_status("in_progress")?;
        stats.blocked_issues = count_by_status("blocked")?;
        stats.deferred_issues = count_by_status("deferred")?;
        stats.closed_issues = count_by_status("closed")?;

        {
            let mut stmt = conn.prepare(
                "SELECT issue_type, COUNT(*) FROM issues GROUP BY issue_type ORDER BY COUNT(*) DESC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                stats.by_type.push(row?);
            }
        }

        {
            let mut stmt = conn.prepare(
                "SELECT priority, COUNT(*) FROM issues GROUP BY priority ORDER BY priority ASC",
            )?;
            let rows =
                stmt.query_map([], |row| Ok((row.get::<_, i32>(0)?, row.get::<_, i64>(1)?)))?;
            for row in rows {
                stats.by_priority.push(row?);
            }
        }

        Ok(stats)
    }

    /// Returns recent events for an issue, newest first.
    pub fn get_events_impl(&self, issue_id: &str, limit: i32) -> Result<Vec<Event>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, issue_id, event_type, actor, old_value, new_value, created_at
             FROM events WHERE issue_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![issue_id, limit], |row| {
            Ok(Event {
                id: row.get("id")?,
                issue_id: row.get("issue_id")?,
                event_type: EventType::from(row.get::<_, String>("event_type")?),
                actor: row.get("actor")?,
                old_value: row.get("old_value")?,
                new_value: row.get("new_value")?,
                created_at: parse_datetime(&row.get::<_, String>("created_at")?),
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Records an audit event directly (sync-produced events).
    pub fn record_event_impl(
        &self,
        issue_id: &str,
        event_type: &EventType,
        actor: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let now_str = format_datetime(&chrono::Utc::now());
        emit_event(&conn, issue_id, event_type, actor, old_value, new_value, &now_str)
    }
}
