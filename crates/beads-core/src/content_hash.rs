//! Deterministic content hashing for issues.
//!
//! Produces a SHA-256 hex digest over all substantive fields (excluding
//! ID and timestamps) so that identical content produces identical hashes
//! across all clones. The flush coordinator compares these against the
//! recorded export hashes to decide what an incremental export must write.

use sha2::{Digest, Sha256};

use crate::issue::Issue;

/// Separator byte written between fields.
const SEP: u8 = 0;

/// Computes a deterministic content hash for an issue.
pub fn compute_content_hash(issue: &Issue) -> String {
    let mut h = Sha256::new();

    write_str(&mut h, &issue.title);
    write_str(&mut h, &issue.description);
    write_str(&mut h, &issue.spec_id);
    write_str(&mut h, issue.status.as_str());
    write_int(&mut h, issue.priority);
    write_str(&mut h, issue.issue_type.as_str());
    write_str(&mut h, &issue.assignee);
    write_str(&mut h, &issue.created_by);
    write_str(&mut h, &issue.close_reason);

    write_flag(&mut h, issue.ephemeral, "ephemeral");
    write_flag(&mut h, issue.is_template, "template");
    write_str(&mut h, &issue.await_type);
    write_str(&mut h, &issue.await_id);

    write_str_opt(&mut h, issue.external_ref.as_deref());
    write_str(&mut h, &issue.source_repo);
    match &issue.metadata {
        Some(meta) => write_str(&mut h, &meta.to_string()),
        None => h.update([SEP]),
    }

    // Relational data in sorted order so hydration order does not matter.
    let mut labels = issue.labels.clone();
    labels.sort();
    for label in &labels {
        write_str(&mut h, label);
    }

    let mut dep_keys: Vec<(String, String)> =
        issue.dependencies.iter().map(|d| d.key()).collect();
    dep_keys.sort();
    for (to, kind) in &dep_keys {
        write_str(&mut h, to);
        write_str(&mut h, kind);
    }

    for comment in &issue.comments {
        write_int(&mut h, comment.index);
        write_str(&mut h, &comment.author);
        write_str(&mut h, &comment.text);
    }

    format!("{:x}", h.finalize())
}

// -- helper writers --------------------------------------------------------

fn write_str(h: &mut Sha256, s: &str) {
    h.update(s.as_bytes());
    h.update([SEP]);
}

fn write_int(h: &mut Sha256, n: i32) {
    h.update(n.to_string().as_bytes());
    h.update([SEP]);
}

fn write_str_opt(h: &mut Sha256, s: Option<&str>) {
    if let Some(s) = s {
        h.update(s.as_bytes());
    }
    h.update([SEP]);
}

fn write_flag(h: &mut Sha256, b: bool, label: &str) {
    if b {
        h.update(label.as_bytes());
    }
    h.update([SEP]);
}
