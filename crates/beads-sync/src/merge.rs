//! Per-entity 3-way merge.
//!
//! The merge operates on snapshots: maps from issue id to either a live
//! record or a tombstone. For every id in the union of base, local, and
//! remote, the decision table picks a side or descends into a field-level
//! merge. Collection fields union; scalars are last-write-wins with a
//! deterministic remote tie-break; deletions lose to concurrent
//! modifications (resurrection) rather than dropping data.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use beads_core::comment::Comment;
use beads_core::dependency::Dependency;
use beads_core::issue::Issue;
use beads_core::tombstone::Tombstone;
use beads_journal::codec;

/// One side's view of an entity.
#[derive(Debug, Clone)]
pub enum Entry {
    Live(Issue),
    Dead(Tombstone),
}

impl Entry {
    pub fn as_live(&self) -> Option<&Issue> {
        match self {
            Self::Live(issue) => Some(issue),
            Self::Dead(_) => None,
        }
    }

    /// Canonical serialization used for equality between sides. Store
    /// internals (content hash, rowids) do not participate.
    fn fingerprint(&self) -> String {
        match self {
            Self::Live(issue) => codec::canonical_line(issue).unwrap_or_default(),
            Self::Dead(t) => format!("dead:{}:{}", t.id, t.deleted_at.to_rfc3339()),
        }
    }
}

fn entries_equal(a: &Entry, b: &Entry) -> bool {
    a.fingerprint() == b.fingerprint()
}

/// A full view of one side, keyed by id.
pub type Snapshot = BTreeMap<String, Entry>;

/// Builds a snapshot from journal records (tombstone records become
/// [`Entry::Dead`]).
pub fn snapshot_from_records(records: Vec<Issue>) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for record in records {
        let entry = match Tombstone::from_journal_record(&record) {
            Some(tombstone) => Entry::Dead(tombstone),
            None => Entry::Live(record),
        };
        snapshot.insert(
            match &entry {
                Entry::Live(issue) => issue.id.clone(),
                Entry::Dead(t) => t.id.clone(),
            },
            entry,
        );
    }
    snapshot
}

/// Tuning knobs for the merge.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Days a tombstone stays authoritative.
    pub tombstone_ttl_days: i64,
    /// Local/remote divergence beyond this duration emits a clock-skew
    /// warning (LWW still applies).
    pub clock_skew_warn: Duration,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            tombstone_ttl_days: beads_core::tombstone::DEFAULT_TTL_DAYS,
            clock_skew_warn: Duration::hours(24),
        }
    }
}

/// Noteworthy merge outcomes, recorded as events by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEvent {
    /// A deletion lost to a concurrent modification.
    Resurrected { id: String, deleter: String },
    /// Local and remote timestamps diverged suspiciously far.
    ClockSkewWarning { id: String, skew_hours: i64 },
    /// Two independently-valid edges formed a blocking cycle; the newer
    /// one was dropped.
    CycleResolved {
        issue_id: String,
        depends_on_id: String,
        kind: String,
    },
}

/// Result of a 3-way merge.
#[derive(Debug)]
pub struct MergeOutcome {
    pub merged: Snapshot,
    pub events: Vec<MergeEvent>,
}

/// Merges local and remote against the shared base.
pub fn merge3(
    base: &Snapshot,
    local: &Snapshot,
    remote: &Snapshot,
    opts: &MergeOptions,
) -> MergeOutcome {
    let now = Utc::now();
    let mut events = Vec::new();
    let mut merged = Snapshot::new();

    let mut ids: BTreeSet<&String> = BTreeSet::new();
    ids.extend(base.keys());
    ids.extend(local.keys());
    ids.extend(remote.keys());

    for id in ids {
        let outcome = merge_entity(
            id,
            base.get(id),
            local.get(id),
            remote.get(id),
            opts,
            now,
            &mut events,
        );
        if let Some(entry) = outcome {
            merged.insert(id.clone(), entry);
        }
    }

    resolve_merge_cycles(&mut merged, &mut events);

    MergeOutcome { merged, events }
}

fn merge_entity(
    id: &str,
    base: Option<&Entry>,
    local: Option<&Entry>,
    remote: Option<&Entry>,
    opts: &MergeOptions,
    now: DateTime<Utc>,
    events: &mut Vec<MergeEvent>,
) -> Option<Entry> {
    match (local, remote) {
        // Gone from both sides: nothing to carry (also drops entries that
        // only base still knows about).
        (None, None) => None,

        // Present on exactly one side.
        (Some(l), None) => match base {
            // Unchanged since base and absent on the other side: the
            // deletion propagates.
            Some(b) if entries_equal(b, l) => None,
            // Modified (or new) locally: keep it. A bare absence has no
            // deleter to attribute.
            Some(_) => {
                if l.as_live().is_some() {
                    events.push(MergeEvent::Resurrected {
                        id: id.to_owned(),
                        deleter: "unknown".to_owned(),
                    });
                }
                Some(l.clone())
            }
            None => Some(l.clone()),
        },
        (None, Some(r)) => match base {
            Some(b) if entries_equal(b, r) => None,
            Some(_) => {
                if r.as_live().is_some() {
                    events.push(MergeEvent::Resurrected {
                        id: id.to_owned(),
                        deleter: "unknown".to_owned(),
                    });
                }
                Some(r.clone())
            }
            None => Some(r.clone()),
        },

        // Present on both sides.
        (Some(l), Some(r)) => {
            if entries_equal(l, r) {
                return Some(l.clone());
            }
            if let Some(b) = base {
                if entries_equal(b, l) {
                    return Some(r.clone());
                }
                if entries_equal(b, r) {
                    return Some(l.clone());
                }
            }

            // Both sides changed, differently.
            match (l, r) {
                (Entry::Live(li), Entry::Live(ri)) => Some(Entry::Live(merge_fields(
                    id,
                    base.and_then(Entry::as_live),
                    li,
                    ri,
                    opts,
                    events,
                ))),
                (Entry::Live(live), Entry::Dead(tomb))
                | (Entry::Dead(tomb), Entry::Live(live)) => {
                    Some(merge_live_vs_dead(id, base, live, tomb, opts, now, events))
                }
                (Entry::Dead(a), Entry::Dead(b)) => {
                    // Both deleted; keep the later marker so the TTL
                    // window covers both clocks.
                    let later = if a.deleted_at >= b.deleted_at { a } else { b };
                    Some(Entry::Dead(later.clone()))
                }
            }
        }
    }
}

/// Modification-vs-deletion with both sides changed from base.
fn merge_live_vs_dead(
    id: &str,
    base: Option<&Entry>,
    live: &Issue,
    tomb: &Tombstone,
    opts: &MergeOptions,
    now: DateTime<Utc>,
    events: &mut Vec<MergeEvent>,
) -> Entry {
    let resurrect = if base.is_some() {
        // The live side differs from base (the equal cases were handled
        // by the caller): the modification wins.
        true
    } else {
        // No shared history. A tombstone within its TTL beats an older
        // record; a record touched after the deletion survives.
        live.updated_at > tomb.deleted_at || tomb.is_expired(now, opts.tombstone_ttl_days)
    };

    if resurrect {
        events.push(MergeEvent::Resurrected {
            id: id.to_owned(),
            deleter: if tomb.deleted_by.is_empty() {
                "unknown".to_owned()
            } else {
                tomb.deleted_by.clone()
            },
        });
        Entry::Live(live.clone())
    } else {
        Entry::Dead(tomb.clone())
    }
}

/// Field-level merge for two live records.
fn merge_fields(
    id: &str,
    _base: Option<&Issue>,
    local: &Issue,
    remote: &Issue,
    opts: &MergeOptions,
    events: &mut Vec<MergeEvent>,
) -> Issue {
    let skew = (local.updated_at - remote.updated_at).abs();
    if skew > opts.clock_skew_warn {
        events.push(MergeEvent::ClockSkewWarning {
            id: id.to_owned(),
            skew_hours: skew.num_hours(),
        });
    }

    // Scalars: last-write-wins by updated_at; exact tie goes to remote so
    // every clone resolves identically.
    let mut merged = if local.updated_at > remote.updated_at {
        local.clone()
    } else {
        remote.clone()
    };

    // Collections are immune to clock problems: union, never overwrite.
    let mut labels: BTreeSet<String> = local.labels.iter().cloned().collect();
    labels.extend(remote.labels.iter().cloned());
    merged.labels = labels.into_iter().collect();

    let mut deps: BTreeMap<(String, String), Dependency> = BTreeMap::new();
    for dep in local.dependencies.iter().chain(remote.dependencies.iter()) {
        deps.entry(dep.key())
            .and_modify(|existing| {
                if dep.created_at < existing.created_at {
                    *existing = dep.clone();
                }
            })
            .or_insert_with(|| dep.clone());
    }
    merged.dependencies = deps.into_values().collect();

    merged.comments = merge_comments(&local.comments, &remote.comments);

    merged.created_at = local.created_at.min(remote.created_at);
    merged.updated_at = local.updated_at.max(remote.updated_at);

    merged
}

/// Append + dedup by content, ordered by creation time, reindexed.
fn merge_comments(local: &[Comment], remote: &[Comment]) -> Vec<Comment> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut all: Vec<Comment> = Vec::new();
    for comment in local.iter().chain(remote.iter()) {
        if seen.insert(comment.content_key()) {
            all.push(comment.clone());
        }
    }
    all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.index.cmp(&b.index)));
    for (i, comment) in all.iter_mut().enumerate() {
        comment.index = i as i32;
    }
    all
}

/// Two independent edits can close a blocking cycle that neither side
/// could create alone. Deterministic repair: drop the newest offending
/// edge (by created_at, edge key as tie-break) until the blocking graph
/// is acyclic, recording each drop.
fn resolve_merge_cycles(merged: &mut Snapshot, events: &mut Vec<MergeEvent>) {
    loop {
        let Some(cycle_edges) = find_blocking_cycle(merged) else {
            return;
        };

        let Some((issue_id, dep_key)) = cycle_edges
            .iter()
            .max_by_key(|(_, dep)| (dep.created_at, dep.depends_on_id.clone()))
            .map(|(id, dep)| (id.clone(), dep.key()))
        else {
            return;
        };

        if let Some(Entry::Live(issue)) = merged.get_mut(&issue_id) {
            if let Some(pos) = issue.dependencies.iter().position(|d| d.key() == dep_key) {
                let dropped = issue.dependencies.remove(pos);
                events.push(MergeEvent::CycleResolved {
                    issue_id: issue_id.clone(),
                    depends_on_id: dropped.depends_on_id,
                    kind: dropped.dep_type.as_str().to_owned(),
                });
                continue;
            }
        }
        // The edge disappeared between detection and removal; cannot
        // happen single-threaded, so stop rather than loop.
        return;
    }
}

/// Finds one cycle in the blocking graph, returned as its edge list.
fn find_blocking_cycle(merged: &Snapshot) -> Option<Vec<(String, Dependency)>> {
    // Adjacency restricted to blocking kinds among live entries.
    let mut adjacency: HashMap<&str, Vec<&Dependency>> = HashMap::new();
    for entry in merged.values() {
        if let Entry::Live(issue) = entry {
            for dep in &issue.dependencies {
                if dep.dep_type.affects_ready_work() && merged.contains_key(&dep.depends_on_id) {
                    adjacency.entry(issue.id.as_str()).or_default().push(dep);
                }
            }
        }
    }

    // DFS with a path stack.
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn dfs<'a>(
        node: &'a str,
        adjacency: &HashMap<&'a str, Vec<&'a Dependency>>,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<(&'a str, &'a Dependency)>,
    ) -> Option<Vec<(String, Dependency)>> {
        marks.insert(node, Mark::InProgress);
        for dep in adjacency.get(node).into_iter().flatten() {
            let next = dep.depends_on_id.as_str();
            match marks.get(next) {
                Some(Mark::Done) => continue,
                Some(Mark::InProgress) => {
                    // Collect the edges from `next` around to `node`,
                    // plus the closing edge.
                    let start = path.iter().position(|(n, _)| *n == next).unwrap_or(0);
                    let mut cycle: Vec<(String, Dependency)> = path[start..]
                        .iter()
                        .map(|(n, d)| ((*n).to_owned(), (*d).clone()))
                        .collect();
                    cycle.push((node.to_owned(), (*dep).clone()));
                    return Some(cycle);
                }
                None => {
                    path.push((node, *dep));
                    if let Some(cycle) = dfs(next, adjacency, marks, path) {
                        return Some(cycle);
                    }
                    path.pop();
                }
            }
        }
        marks.insert(node, Mark::Done);
        None
    }

    let nodes: Vec<&str> = adjacency.keys().copied().collect();
    for node in nodes {
        if !marks.contains_key(node) {
            let mut path = Vec::new();
            if let Some(cycle) = dfs(node, &adjacency, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::enums::DependencyType;
    use beads_core::issue::IssueBuilder;
    use pretty_assertions::assert_eq;

    fn live(id: &str, title: &str, updated: DateTime<Utc>) -> Entry {
        Entry::Live(
            IssueBuilder::new(title)
                .id(id)
                .created_at(updated - Duration::hours(1))
                .updated_at(updated)
                .build(),
        )
    }

    fn snap(entries: Vec<Entry>) -> Snapshot {
        snapshot_from_records(
            entries
                .into_iter()
                .map(|e| match e {
                    Entry::Live(i) => i,
                    Entry::Dead(t) => t.to_journal_record(),
                })
                .collect(),
        )
    }

    fn merged_title(outcome: &MergeOutcome, id: &str) -> Option<String> {
        outcome
            .merged
            .get(id)
            .and_then(Entry::as_live)
            .map(|i| i.title.clone())
    }

    #[test]
    fn identical_sides_are_a_noop() {
        let t = Utc::now();
        let base = snap(vec![live("bd-x", "same", t)]);
        let outcome = merge3(&base, &base.clone(), &base.clone(), &MergeOptions::default());
        assert_eq!(merged_title(&outcome, "bd-x"), Some("same".into()));
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn one_side_changed_wins() {
        let t = Utc::now();
        let base = snap(vec![live("bd-x", "old", t)]);
        let local = snap(vec![live("bd-x", "new", t + Duration::seconds(10))]);
        let remote = base.clone();

        // Local changed.
        let outcome = merge3(&base, &local, &remote, &MergeOptions::default());
        assert_eq!(merged_title(&outcome, "bd-x"), Some("new".into()));

        // Remote changed (mirror).
        let outcome = merge3(&base, &remote, &local, &MergeOptions::default());
        assert_eq!(merged_title(&outcome, "bd-x"), Some("new".into()));
    }

    #[test]
    fn both_changed_lww_scalars() {
        let t = Utc::now();
        let base = snap(vec![live("bd-x", "old", t)]);
        let local = snap(vec![live("bd-x", "local", t + Duration::seconds(5))]);
        let remote = snap(vec![live("bd-x", "remote", t + Duration::seconds(9))]);

        let outcome = merge3(&base, &local, &remote, &MergeOptions::default());
        assert_eq!(merged_title(&outcome, "bd-x"), Some("remote".into()));
    }

    #[test]
    fn exact_tie_goes_to_remote() {
        let t = Utc::now();
        let base = snap(vec![live("bd-x", "old", t)]);
        let local = snap(vec![live("bd-x", "local", t + Duration::seconds(5))]);
        let remote = snap(vec![live("bd-x", "remote", t + Duration::seconds(5))]);

        let outcome = merge3(&base, &local, &remote, &MergeOptions::default());
        assert_eq!(merged_title(&outcome, "bd-x"), Some("remote".into()));
    }

    #[test]
    fn labels_and_deps_union() {
        let t = Utc::now();
        let mut base_issue = IssueBuilder::new("x").id("bd-x").updated_at(t).build();
        base_issue.labels = vec!["shared".into()];

        let mut l = base_issue.clone();
        l.labels.push("local".into());
        l.dependencies
            .push(Dependency::new("bd-x", "bd-l", DependencyType::Blocks));
        l.updated_at = t + Duration::seconds(1);

        let mut r = base_issue.clone();
        r.labels.push("remote".into());
        r.dependencies
            .push(Dependency::new("bd-x", "bd-r", DependencyType::Related));
        r.updated_at = t + Duration::seconds(2);

        let outcome = merge3(
            &snap(vec![Entry::Live(base_issue)]),
            &snap(vec![Entry::Live(l)]),
            &snap(vec![Entry::Live(r)]),
            &MergeOptions::default(),
        );
        let merged = outcome.merged.get("bd-x").unwrap().as_live().unwrap();
        assert_eq!(merged.labels, vec!["local", "remote", "shared"]);
        assert_eq!(merged.dependencies.len(), 2);
    }

    #[test]
    fn comments_append_dedup_sorted() {
        let t = Utc::now();
        let mk = |idx: i32, author: &str, text: &str, at: DateTime<Utc>| Comment {
            id: 0,
            issue_id: "bd-x".into(),
            index: idx,
            author: author.into(),
            text: text.into(),
            created_at: at,
        };

        let mut base_issue = IssueBuilder::new("x").id("bd-x").updated_at(t).build();
        base_issue.comments = vec![mk(0, "alice", "first", t)];

        let mut l = base_issue.clone();
        l.comments.push(mk(1, "bob", "local follow-up", t + Duration::seconds(30)));
        l.updated_at = t + Duration::seconds(30);

        let mut r = base_issue.clone();
        r.comments.push(mk(1, "carol", "remote follow-up", t + Duration::seconds(20)));
        r.updated_at = t + Duration::seconds(20);

        let outcome = merge3(
            &snap(vec![Entry::Live(base_issue)]),
            &snap(vec![Entry::Live(l)]),
            &snap(vec![Entry::Live(r)]),
            &MergeOptions::default(),
        );
        let merged = outcome.merged.get("bd-x").unwrap().as_live().unwrap();
        let texts: Vec<&str> = merged.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "remote follow-up", "local follow-up"]);
        let indexes: Vec<i32> = merged.comments.iter().map(|c| c.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn deletion_propagates_when_other_side_unchanged() {
        let t = Utc::now();
        let base = snap(vec![live("bd-x", "doomed", t)]);
        let local = Snapshot::new(); // deleted locally
        let remote = base.clone(); // untouched remotely

        let outcome = merge3(&base, &local, &remote, &MergeOptions::default());
        assert!(outcome.merged.is_empty());
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn modification_beats_deletion() {
        // Base has X; local deletes it (tombstone); remote updates it.
        let t = Utc::now();
        let base = snap(vec![live("bd-x", "t", t)]);

        let mut tomb = Tombstone::new("bd-x", "alice");
        tomb.deleted_at = t + Duration::seconds(5);
        let local = snap(vec![Entry::Dead(tomb)]);

        let remote = snap(vec![live("bd-x", "t2", t + Duration::seconds(10))]);

        let outcome = merge3(&base, &local, &remote, &MergeOptions::default());
        assert_eq!(merged_title(&outcome, "bd-x"), Some("t2".into()));
        assert_eq!(
            outcome.events,
            vec![MergeEvent::Resurrected {
                id: "bd-x".into(),
                deleter: "alice".into()
            }]
        );
    }

    #[test]
    fn deletion_beats_stale_record_without_base() {
        let t = Utc::now();
        let local = snap(vec![live("bd-x", "stale", t - Duration::hours(2))]);
        let mut tomb = Tombstone::new("bd-x", "bob");
        tomb.deleted_at = t - Duration::hours(1);
        let remote = snap(vec![Entry::Dead(tomb)]);

        let outcome = merge3(&Snapshot::new(), &local, &remote, &MergeOptions::default());
        assert!(matches!(outcome.merged.get("bd-x"), Some(Entry::Dead(_))));
    }

    #[test]
    fn new_on_each_side_both_survive() {
        let t = Utc::now();
        let local = snap(vec![live("bd-l", "mine", t)]);
        let remote = snap(vec![live("bd-r", "theirs", t)]);

        let outcome = merge3(&Snapshot::new(), &local, &remote, &MergeOptions::default());
        assert_eq!(outcome.merged.len(), 2);
    }

    #[test]
    fn clock_skew_warns_but_still_merges() {
        let t = Utc::now();
        let base = snap(vec![live("bd-x", "old", t)]);
        let local = snap(vec![live("bd-x", "local", t + Duration::hours(1))]);
        let remote = snap(vec![live("bd-x", "remote", t + Duration::hours(25))]);

        let outcome = merge3(&base, &local, &remote, &MergeOptions::default());
        assert_eq!(merged_title(&outcome, "bd-x"), Some("remote".into()));
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, MergeEvent::ClockSkewWarning { id, .. } if id == "bd-x")));
    }

    #[test]
    fn merge_cycle_drops_newer_edge() {
        let t = Utc::now();

        // Base: A and B, no edges. Local adds A->B, remote adds B->A
        // (later). Union would be a cycle.
        let a0 = IssueBuilder::new("A").id("bd-a").updated_at(t).build();
        let b0 = IssueBuilder::new("B").id("bd-b").updated_at(t).build();
        let base = snap(vec![Entry::Live(a0.clone()), Entry::Live(b0.clone())]);

        let mut a1 = a0.clone();
        let mut early = Dependency::new("bd-a", "bd-b", DependencyType::Blocks);
        early.created_at = t + Duration::seconds(1);
        a1.dependencies.push(early);
        a1.updated_at = t + Duration::seconds(1);
        let local = snap(vec![Entry::Live(a1), Entry::Live(b0.clone())]);

        let mut b1 = b0.clone();
        let mut late = Dependency::new("bd-b", "bd-a", DependencyType::Blocks);
        late.created_at = t + Duration::seconds(2);
        b1.dependencies.push(late);
        b1.updated_at = t + Duration::seconds(2);
        let remote = snap(vec![Entry::Live(a0.clone()), Entry::Live(b1)]);

        let outcome = merge3(&base, &local, &remote, &MergeOptions::default());

        let a = outcome.merged.get("bd-a").unwrap().as_live().unwrap();
        let b = outcome.merged.get("bd-b").unwrap().as_live().unwrap();
        // The older edge survives; the newer one was dropped and logged.
        assert_eq!(a.dependencies.len(), 1);
        assert!(b.dependencies.is_empty());
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            MergeEvent::CycleResolved { issue_id, depends_on_id, .. }
                if issue_id == "bd-b" && depends_on_id == "bd-a"
        )));
    }

    #[test]
    fn merge_is_order_insensitive_for_union_fields() {
        // I4: swapping local and remote must not change the merged set of
        // labels/deps (scalars differ only by the deterministic tie rule,
        // which picks the same winner by timestamp).
        let t = Utc::now();
        let base_issue = IssueBuilder::new("x").id("bd-x").updated_at(t).build();

        let mut l = base_issue.clone();
        l.labels = vec!["a".into(), "b".into()];
        l.updated_at = t + Duration::seconds(7);

        let mut r = base_issue.clone();
        r.labels = vec!["b".into(), "c".into()];
        r.updated_at = t + Duration::seconds(3);

        let base = snap(vec![Entry::Live(base_issue)]);
        let one = merge3(
            &base,
            &snap(vec![Entry::Live(l.clone())]),
            &snap(vec![Entry::Live(r.clone())]),
            &MergeOptions::default(),
        );
        let two = merge3(
            &base,
            &snap(vec![Entry::Live(r)]),
            &snap(vec![Entry::Live(l)]),
            &MergeOptions::default(),
        );

        let get = |o: &MergeOutcome| {
            let issue = o.merged.get("bd-x").unwrap().as_live().unwrap().clone();
            (issue.title.clone(), issue.labels.clone(), issue.updated_at)
        };
        assert_eq!(get(&one), get(&two));
    }
}
