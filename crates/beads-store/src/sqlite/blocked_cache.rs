//! Materialized blocked cache.
//!
//! `blocked_cache` holds the set of currently-blocked issue ids. It is
//! fully rebuilt inside every transaction that changes a blocking edge,
//! any status, or deletes an issue, so readers are transactionally
//! consistent and the ready query never traverses the graph.
//!
//! Membership rules:
//! - `blocks`: the source is blocked while the target is open,
//!   in progress, or blocked. Closed and deferred targets never block.
//! - `conditional-blocks`: the edge is live only once the target closed
//!   with a failure reason.
//! - `waits-for`: the source is blocked while the target has any
//!   non-closed parent-child child.
//! - `parent-child`: a child inherits its parent's blocked-cache
//!   membership (transitively, bounded by the depth cap).

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use beads_core::dependency::is_failure_close;
use beads_core::enums::{DependencyType, Status};

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;

/// Bound on parent-child propagation passes. A deeper chain is treated as
/// pathological and surfaced as an error rather than silently truncated.
pub(crate) const MAX_PROPAGATION_DEPTH: usize = 50;

/// Rebuilds the blocked cache from the current graph. Must be called on a
/// connection that is inside the mutating transaction.
pub(crate) fn rebuild_blocked_cache_on_conn(conn: &Connection) -> Result<()> {
    // Load statuses and close reasons.
    let mut statuses: HashMap<String, (Status, String)> = HashMap::new();
    {
        let mut stmt = conn.prepare_cached("SELECT id, status, close_reason FROM issues")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (id, status, close_reason) = row?;
            statuses.insert(id, (Status::from(status), close_reason));
        }
    }

    // Load blocking-kind edges.
    let mut edges: Vec<(String, String, DependencyType)> = Vec::new();
    {
        let mut stmt = conn.prepare_cached(
            "SELECT issue_id, depends_on_id, type FROM dependencies
             WHERE type IN ('blocks', 'parent-child', 'conditional-blocks', 'waits-for')",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (from, to, kind) = row?;
            edges.push((from, to, DependencyType::from(kind)));
        }
    }

    // Children per parent, for waits-for gates.
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for (from, to, kind) in &edges {
        if *kind == DependencyType::ParentChild {
            children.entry(to.as_str()).or_default().push(from.as_str());
        }
    }

    // Phase 1: directly blocked issues.
    let mut blocked: HashSet<&str> = HashSet::new();
    for (from, to, kind) in &edges {
        let live = match kind {
            DependencyType::Blocks => statuses
                .get(to)
                .is_some_and(|(status, _)| status.is_active_blocker()),
            DependencyType::ConditionalBlocks => statuses
                .get(to)
                .is_some_and(|(status, reason)| {
                    *status == Status::Closed && is_failure_close(reason)
                }),
            DependencyType::WaitsFor => children
                .get(to.as_str())
                .is_some_and(|kids| {
                    kids.iter().any(|kid| {
                        statuses
                            .get(*kid)
                            .is_none_or(|(status, _)| *status != Status::Closed)
                    })
                }),
            _ => false,
        };
        if live {
            blocked.insert(from.as_str());
        }
    }

    // Phase 2: children inherit blocked parents, to a fixed point.
    let parent_edges: Vec<(&str, &str)> = edges
        .iter()
        .filter(|(_, _, kind)| *kind == DependencyType::ParentChild)
        .map(|(from, to, _)| (from.as_str(), to.as_str()))
        .collect();

    let mut passes = 0usize;
    loop {
        let mut changed = false;
        for &(child, parent) in &parent_edges {
            if blocked.contains(parent) && blocked.insert(child) {
                changed = true;
            }
        }
        if !changed {
            break;
        }
        passes += 1;
        if passes > MAX_PROPAGATION_DEPTH {
            return Err(StorageError::DepthExceeded {
                limit: MAX_PROPAGATION_DEPTH,
            });
        }
    }

    // Replace the cache contents.
    conn.execute("DELETE FROM blocked_cache", [])?;
    {
        let mut stmt =
            conn.prepare_cached("INSERT INTO blocked_cache (issue_id) VALUES (?1)")?;
        for id in &blocked {
            stmt.execute([id])?;
        }
    }

    Ok(())
}

/// Returns the raw cache contents, sorted.
pub(crate) fn get_blocked_ids_on_conn(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached("SELECT issue_id FROM blocked_cache ORDER BY issue_id")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

impl SqliteStore {
    pub fn get_blocked_ids_impl(&self) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        get_blocked_ids_on_conn(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::dependency::Dependency;
    use beads_core::issue::IssueBuilder;
    use chrono::Utc;

    fn test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn create(store: &SqliteStore, id: &str) {
        let issue = IssueBuilder::new(format!("Issue {id}")).id(id).build();
        store.create_issue_impl(&issue, "t").unwrap();
    }

    fn dep(store: &SqliteStore, from: &str, to: &str, kind: DependencyType) {
        store
            .add_dependency_impl(&Dependency::new(from, to, kind), "t")
            .unwrap();
    }

    #[test]
    fn blocks_edge_populates_cache() {
        let store = test_store();
        create(&store, "bd-a");
        create(&store, "bd-b");
        dep(&store, "bd-b", "bd-a", DependencyType::Blocks);

        assert_eq!(store.get_blocked_ids_impl().unwrap(), vec!["bd-b"]);
    }

    #[test]
    fn closing_blocker_unblocks() {
        let store = test_store();
        create(&store, "bd-a");
        create(&store, "bd-b");
        dep(&store, "bd-b", "bd-a", DependencyType::Blocks);

        store.close_issue_impl("bd-a", "done", "t").unwrap();
        assert!(store.get_blocked_ids_impl().unwrap().is_empty());

        // Reopening restores the block.
        store.reopen_issue_impl("bd-a", "t").unwrap();
        assert_eq!(store.get_blocked_ids_impl().unwrap(), vec!["bd-b"]);
    }

    #[test]
    fn deferred_blocker_does_not_block() {
        let store = test_store();
        create(&store, "bd-a");
        create(&store, "bd-b");
        dep(&store, "bd-b", "bd-a", DependencyType::Blocks);

        let updates = crate::traits::IssueUpdates {
            status: Some(Status::Deferred),
            ..Default::default()
        };
        store.update_issue_impl("bd-a", &updates, "t").unwrap();
        assert!(store.get_blocked_ids_impl().unwrap().is_empty());
    }

    #[test]
    fn child_inherits_blocked_parent() {
        let store = test_store();
        create(&store, "bd-blocker");
        create(&store, "bd-parent");
        create(&store, "bd-child");
        create(&store, "bd-grandchild");

        dep(&store, "bd-parent", "bd-blocker", DependencyType::Blocks);
        dep(&store, "bd-child", "bd-parent", DependencyType::ParentChild);
        dep(&store, "bd-grandchild", "bd-child", DependencyType::ParentChild);

        let blocked = store.get_blocked_ids_impl().unwrap();
        assert_eq!(blocked, vec!["bd-child", "bd-grandchild", "bd-parent"]);
    }

    #[test]
    fn open_parent_alone_does_not_block_child() {
        let store = test_store();
        create(&store, "bd-parent");
        create(&store, "bd-child");
        dep(&store, "bd-child", "bd-parent", DependencyType::ParentChild);

        // The parent is open but not itself blocked; the child only
        // inherits cache membership.
        assert!(store.get_blocked_ids_impl().unwrap().is_empty());
    }

    #[test]
    fn conditional_blocks_requires_failure_close() {
        let store = test_store();
        create(&store, "bd-risky");
        create(&store, "bd-fallback");
        dep(
            &store,
            "bd-fallback",
            "bd-risky",
            DependencyType::ConditionalBlocks,
        );

        // Not live while the target is open.
        assert!(store.get_blocked_ids_impl().unwrap().is_empty());

        // A success close keeps it dormant.
        store.close_issue_impl("bd-risky", "completed", "t").unwrap();
        assert!(store.get_blocked_ids_impl().unwrap().is_empty());

        // A failure close activates the edge.
        store.reopen_issue_impl("bd-risky", "t").unwrap();
        store.close_issue_impl("bd-risky", "failed in CI", "t").unwrap();
        assert_eq!(store.get_blocked_ids_impl().unwrap(), vec!["bd-fallback"]);
    }

    #[test]
    fn waits_for_gates_on_children() {
        let store = test_store();
        create(&store, "bd-epic");
        create(&store, "bd-kid1");
        create(&store, "bd-kid2");
        create(&store, "bd-waiter");

        dep(&store, "bd-kid1", "bd-epic", DependencyType::ParentChild);
        dep(&store, "bd-kid2", "bd-epic", DependencyType::ParentChild);
        dep(&store, "bd-waiter", "bd-epic", DependencyType::WaitsFor);

        assert!(store.get_blocked_ids_impl().unwrap().contains(&"bd-waiter".to_string()));

        store.close_issue_impl("bd-kid1", "done", "t").unwrap();
        assert!(store.get_blocked_ids_impl().unwrap().contains(&"bd-waiter".to_string()));

        store.close_issue_impl("bd-kid2", "done", "t").unwrap();
        assert!(!store.get_blocked_ids_impl().unwrap().contains(&"bd-waiter".to_string()));
    }

    #[test]
    fn waits_for_without_children_does_not_block() {
        let store = test_store();
        create(&store, "bd-empty");
        create(&store, "bd-waiter");
        dep(&store, "bd-waiter", "bd-empty", DependencyType::WaitsFor);

        assert!(store.get_blocked_ids_impl().unwrap().is_empty());
    }

    #[test]
    fn delete_clears_membership() {
        let store = test_store();
        create(&store, "bd-a");
        create(&store, "bd-b");
        dep(&store, "bd-b", "bd-a", DependencyType::Blocks);

        store.delete_issue_impl("bd-a", "t").unwrap();
        assert!(store.get_blocked_ids_impl().unwrap().is_empty());
    }

    #[test]
    fn deep_parent_chain_within_cap() {
        let store = test_store();
        create(&store, "bd-blk");
        let n = 49;
        for i in 0..=n {
            create(&store, &format!("bd-n{i}"));
        }
        dep(&store, "bd-n0", "bd-blk", DependencyType::Blocks);
        for i in 0..n {
            dep(
                &store,
                &format!("bd-n{}", i + 1),
                &format!("bd-n{i}"),
                DependencyType::ParentChild,
            );
        }

        let blocked = store.get_blocked_ids_impl().unwrap();
        assert_eq!(blocked.len(), (n + 1) as usize);
    }

    /// Randomized walk: after every mutation the cache must equal a
    /// reference computation done issue-by-issue.
    #[test]
    fn cache_matches_reference_bfs_under_random_walk() {
        let store = test_store();
        let n = 12;
        for i in 0..n {
            create(&store, &format!("bd-w{i}"));
        }

        // Deterministic pseudo-random sequence (LCG).
        let mut seed: u64 = 0x5eed;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        for _ in 0..120 {
            let a = next() % n;
            let b = next() % n;
            match next() % 4 {
                0 if a != b => {
                    let d = Dependency::new(
                        format!("bd-w{a}"),
                        format!("bd-w{b}"),
                        DependencyType::Blocks,
                    );
                    // Cycles and duplicates are legitimately rejected.
                    let _ = store.add_dependency_impl(&d, "t");
                }
                1 => {
                    let _ = store.close_issue_impl(&format!("bd-w{a}"), "done", "t");
                }
                2 => {
                    let _ = store.reopen_issue_impl(&format!("bd-w{a}"), "t");
                }
                _ => {
                    let _ = store.remove_dependency_impl(
                        &format!("bd-w{a}"),
                        &format!("bd-w{b}"),
                        &DependencyType::Blocks,
                        "t",
                    );
                }
            }

            let cached = store.get_blocked_ids_impl().unwrap();
            let expected = reference_blocked(&store);
            assert_eq!(cached, expected, "cache diverged from reference");
        }
    }

    /// Reference implementation: an issue is blocked iff one of its
    /// `blocks` targets is an active blocker (the walk only creates
    /// `blocks` edges).
    fn reference_blocked(store: &SqliteStore) -> Vec<String> {
        let conn = store.lock_conn().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT d.issue_id FROM dependencies d
                 JOIN issues b ON b.id = d.depends_on_id
                 WHERE d.type = 'blocks'
                   AND b.status IN ('open', 'in_progress', 'blocked')
                 ORDER BY d.issue_id",
            )
            .unwrap();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn status_and_timestamp_roundtrip() {
        let store = test_store();
        create(&store, "bd-rt");
        let issue = store.get_issue_impl("bd-rt").unwrap();
        assert!(issue.created_at <= Utc::now());
    }
}
