//! Dependency CRUD operations and cycle detection for [`SqliteStore`].

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use beads_core::dependency::Dependency;
use beads_core::enums::{DependencyType, EventType};
use beads_core::issue::Issue;

use crate::error::{Result, StorageError};
use crate::sqlite::blocked_cache::rebuild_blocked_cache_on_conn;
use crate::sqlite::dirty::mark_dirty_on_conn;
use crate::sqlite::issues::{
    ISSUE_COLUMNS_PREFIXED, emit_event, format_datetime, get_issue_on_conn, parse_datetime,
    refresh_content_hash, scan_issue, touch_issue,
};
use crate::sqlite::store::SqliteStore;
use crate::traits::TreeNode;

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

/// Inserts a dependency on the given connection, with cycle detection for
/// blocking types.
pub(crate) fn add_dependency_on_conn(
    conn: &Connection,
    dep: &Dependency,
    actor: &str,
) -> Result<()> {
    if dep.issue_id == dep.depends_on_id {
        return Err(StorageError::validation(
            "deps",
            "an issue cannot depend on itself",
        ));
    }

    // The source row must exist; the target may arrive later through sync.
    get_issue_on_conn(conn, &dep.issue_id)?;

    // An issue has at most one parent.
    if dep.dep_type == DependencyType::ParentChild {
        let existing: Option<String> = conn
            .query_row(
                "SELECT depends_on_id FROM dependencies
                 WHERE issue_id = ?1 AND type = 'parent-child'",
                params![dep.issue_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(parent) = existing {
            return Err(StorageError::validation(
                "deps",
                format!("{} already has parent {parent}", dep.issue_id),
            ));
        }
    }

    if dep.dep_type.affects_ready_work() {
        detect_cycle(conn, &dep.issue_id, &dep.depends_on_id)?;
    }

    let now = Utc::now();
    let now_str = format_datetime(&now);

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO dependencies
         (issue_id, depends_on_id, type, created_at, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            dep.issue_id,
            dep.depends_on_id,
            dep.dep_type.as_str(),
            format_datetime(&dep.created_at),
            dep.created_by,
        ],
    )?;
    if inserted == 0 {
        return Err(StorageError::already_exists(
            "dependency",
            format!("{} -> {} ({})", dep.issue_id, dep.depends_on_id, dep.dep_type),
        ));
    }

    emit_event(
        conn,
        &dep.issue_id,
        &EventType::DependencyAdded,
        actor,
        None,
        Some(&format!("{} ({})", dep.depends_on_id, dep.dep_type)),
        &now_str,
    )?;

    touch_issue(conn, &dep.issue_id, &now_str)?;
    refresh_content_hash(conn, &dep.issue_id)?;
    mark_dirty_on_conn(conn, &dep.issue_id)?;
    if dep.dep_type.affects_ready_work() {
        rebuild_blocked_cache_on_conn(conn)?;
    }

    Ok(())
}

/// Removes a dependency on the given connection.
pub(crate) fn remove_dependency_on_conn(
    conn: &Connection,
    issue_id: &str,
    depends_on_id: &str,
    dep_type: &DependencyType,
    actor: &str,
) -> Result<()> {
    let now_str = format_datetime(&Utc::now());

    let affected = conn.execute(
        "DELETE FROM dependencies WHERE issue_id = ?1 AND depends_on_id = ?2 AND type = ?3",
        params![issue_id, depends_on_id, dep_type.as_str()],
    )?;

    if affected == 0 {
        return Err(StorageError::not_found(
            "dependency",
            format!("{issue_id} -> {depends_on_id} ({dep_type})"),
        ));
    }

    emit_event(
        conn,
        issue_id,
        &EventType::DependencyRemoved,
        actor,
        Some(&format!("{depends_on_id} ({dep_type})")),
        None,
        &now_str,
    )?;

    touch_issue(conn, issue_id, &now_str)?;
    refresh_content_hash(conn, issue_id)?;
    mark_dirty_on_conn(conn, issue_id)?;
    if dep_type.affects_ready_work() {
        rebuild_blocked_cache_on_conn(conn)?;
    }

    Ok(())
}

/// Returns raw dependency records for an issue on the given connection.
pub(crate) fn get_dependency_records_on_conn(
    conn: &Connection,
    issue_id: &str,
) -> Result<Vec<Dependency>> {
    let mut stmt = conn.prepare_cached(
        "SELECT issue_id, depends_on_id, type, created_at, created_by
         FROM dependencies WHERE issue_id = ?1
         ORDER BY depends_on_id, type",
    )?;
    let rows = stmt.query_map(params![issue_id], |row| {
        Ok(Dependency {
            issue_id: row.get("issue_id")?,
            depends_on_id: row.get("depends_on_id")?,
            dep_type: DependencyType::from(row.get::<_, String>("type")?),
            created_at: parse_datetime(&row.get::<_, String>("created_at")?),
            created_by: row.get("created_by")?,
        })
    })?;

    let mut deps = Vec::new();
    for row in rows {
        deps.push(row?);
    }
    Ok(deps)
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

/// Detects whether adding an edge `issue_id -> depends_on_id` would create
/// a cycle in the blocking dependency graph. BFS from `depends_on_id`; if
/// `issue_id` is reachable, the new edge would close a loop. The error
/// carries the full path for the user.
fn detect_cycle(conn: &Connection, issue_id: &str, depends_on_id: &str) -> Result<()> {
    let mut predecessor: HashMap<String, String> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(depends_on_id.to_string());

    while let Some(current) = queue.pop_front() {
        if current == issue_id {
            // Reconstruct issue_id -> depends_on_id -> ... -> issue_id.
            let mut path = vec![current.clone()];
            let mut node = current;
            while let Some(prev) = predecessor.get(&node) {
                path.push(prev.clone());
                node = prev.clone();
            }
            path.push(issue_id.to_string());
            path.reverse();
            return Err(StorageError::CycleDetected { path });
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        let mut stmt = conn.prepare_cached(
            "SELECT depends_on_id FROM dependencies
             WHERE issue_id = ?1
               AND type IN ('blocks', 'parent-child', 'conditional-blocks', 'waits-for')",
        )?;
        let rows = stmt.query_map(params![current], |row| row.get::<_, String>(0))?;
        for row in rows {
            let next = row?;
            if !visited.contains(&next) {
                predecessor.entry(next.clone()).or_insert_with(|| current.clone());
                queue.push_back(next);
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Adds a dependency edge transactionally.
    pub fn add_dependency_impl(&self, dep: &Dependency, actor: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        add_dependency_on_conn(&tx, dep, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    /// Removes a dependency edge transactionally.
    pub fn remove_dependency_impl(
        &self,
        issue_id: &str,
        depends_on_id: &str,
        dep_type: &DependencyType,
        actor: &str,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
        remove_dependency_on_conn(&tx, issue_id, depends_on_id, dep_type, actor)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(format!("failed to commit: {e}")))?;
        Ok(())
    }

    pub fn get_dependency_records_impl(&self, issue_id: &str) -> Result<Vec<Dependency>> {
        let conn = self.lock_conn()?;
        get_dependency_records_on_conn(&conn, issue_id)
    }

    /// Returns issues that the given issue depends on.
    pub fn get_dependencies_impl(&self, issue_id: &str) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {ISSUE_COLUMNS_PREFIXED} FROM issues
             INNER JOIN dependencies d ON issues.id = d.depends_on_id
             WHERE d.issue_id = ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![issue_id], scan_issue)?;
        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        Ok(issues)
    }

    /// Returns issues that depend on the given issue.
    pub fn get_dependents_impl(&self, issue_id: &str) -> Result<Vec<Issue>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {ISSUE_COLUMNS_PREFIXED} FROM issues
             INNER JOIN dependencies d ON issues.id = d.issue_id
             WHERE d.depends_on_id = ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![issue_id], scan_issue)?;
        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        Ok(issues)
    }

    /// Traverses the dependency tree from a root issue (BFS, first path
    /// wins).
    pub fn get_dependency_tree_impl(
        &self,
        issue_id: &str,
        max_depth: i32,
        reverse: bool,
    ) -> Result<Vec<TreeNode>> {
        let conn = self.lock_conn()?;

        let mut result = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, i32)> = VecDeque::new();

        let root = get_issue_on_conn(&conn, issue_id)?;
        let root_id = root.id.clone();
        result.push(TreeNode {
            issue: root,
            depth: 0,
            dep_type: DependencyType::Blocks,
        });
        visited.insert(root_id.clone());
        queue.push_back((root_id, 0));

        while let Some((current_id, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }

            let sql = if reverse {
                "SELECT d.issue_id, d.type FROM dependencies d WHERE d.depends_on_id = ?1"
            } else {
                "SELECT d.depends_on_id, d.type FROM dependencies d WHERE d.issue_id = ?1"
            };

            let mut stmt = conn.prepare(sql)?;
            let edges: Vec<(String, String)> = stmt
                .query_map(params![current_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .filter_map(|r| r.ok())
                .collect();

            for (next_id, dep_type_str) in edges {
                if visited.contains(&next_id) {
                    continue;
                }
                visited.insert(next_id.clone());

                if let Ok(issue) = get_issue_on_conn(&conn, &next_id) {
                    result.push(TreeNode {
                        issue,
                        depth: depth + 1,
                        dep_type: DependencyType::from(dep_type_str.as_str()),
                    });
                    queue.push_back((next_id, depth + 1));
                }
            }
        }

        Ok(result)
    }
}
