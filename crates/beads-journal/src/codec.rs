//! Canonical journal line encoding and decoding.
//!
//! One record per line, each a JSON object with keys in fixed
//! alphabetical order, UTF-8, LF terminator, no trailing whitespace.
//! Deterministic field order keeps git diffs readable and makes the
//! export bytewise reproducible (the export hash is the hash of the
//! line). Blank lines and `#`-prefixed lines are ignored on read; bare
//! git conflict markers abort the read.

use sha2::{Digest, Sha256};

use beads_core::issue::Issue;
use beads_store::StorageError;

/// Error type for journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error at line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },

    /// The file contains unresolved git conflict markers.
    #[error("journal contains git conflict markers (first at line {line})")]
    ConflictMarkers { line: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Serializes an issue as its canonical journal line (no trailing
/// newline).
///
/// Round-tripping through `serde_json::Value` sorts object keys
/// alphabetically, which is exactly the canonical order.
pub fn canonical_line(issue: &Issue) -> Result<String, JournalError> {
    let value = serde_json::to_value(issue).map_err(|e| JournalError::Json { line: 0, source: e })?;
    serde_json::to_string(&value).map_err(|e| JournalError::Json { line: 0, source: e })
}

/// SHA-256 hex digest of a canonical line; the per-issue export hash.
pub fn line_hash(line: &str) -> String {
    format!("{:x}", Sha256::digest(line.as_bytes()))
}

/// SHA-256 hex digest of a whole journal's bytes.
pub fn journal_hash(contents: &str) -> String {
    format!("{:x}", Sha256::digest(contents.as_bytes()))
}

/// Returns the 1-based line number of the first bare git conflict marker,
/// if any.
pub fn find_conflict_marker(contents: &str) -> Option<usize> {
    for (i, line) in contents.lines().enumerate() {
        if line.starts_with("<<<<<<<") || line.starts_with(">>>>>>>") || line == "=======" {
            return Some(i + 1);
        }
    }
    None
}

/// Parses journal contents into records.
///
/// Skips blank and `#`-prefixed lines; fails on conflict markers before
/// parsing anything so a half-merged file never reaches the store.
pub fn parse_journal(contents: &str) -> Result<Vec<Issue>, JournalError> {
    if let Some(line) = find_conflict_marker(contents) {
        return Err(JournalError::ConflictMarkers { line });
    }

    let mut records = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut issue: Issue = serde_json::from_str(trimmed).map_err(|e| JournalError::Json {
            line: i + 1,
            source: e,
        })?;
        issue.set_defaults();
        records.push(issue);
    }
    Ok(records)
}

/// Extracts just the `id` field of a journal line, without a full record
/// parse. Used by the incremental exporter to key untouched lines.
pub fn line_id(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value.get("id")?.as_str().map(str::to_owned)
}

/// Renders records as a full journal: one canonical line each, LF
/// terminated.
pub fn render_journal(records: &[Issue]) -> Result<String, JournalError> {
    let mut out = String::new();
    for record in records {
        out.push_str(&canonical_line(record)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::issue::IssueBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_line_sorts_keys() {
        let issue = IssueBuilder::new("Zed")
            .id("bd-k1")
            .assignee("alice")
            .description("desc")
            .build();
        let line = canonical_line(&issue).unwrap();

        let keys: Vec<usize> = ["assignee", "created_at", "description", "id", "title"]
            .iter()
            .map(|k| line.find(&format!("\"{k}\"")).unwrap())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted, "keys must appear in alphabetical order");
        assert!(!line.ends_with(' '));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn canonical_line_deterministic() {
        let issue = IssueBuilder::new("Same").id("bd-det").build();
        assert_eq!(canonical_line(&issue).unwrap(), canonical_line(&issue).unwrap());
    }

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let contents = "# journal header\n\n{\"id\":\"bd-a\",\"title\":\"A\"}\n\n";
        let records = parse_journal(contents).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "bd-a");
    }

    #[test]
    fn parse_reports_json_error_line() {
        let contents = "{\"id\":\"bd-a\",\"title\":\"A\"}\nnot-json\n";
        match parse_journal(contents) {
            Err(JournalError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected Json error, got {other:?}"),
        }
    }

    #[test]
    fn conflict_markers_rejected_with_line_number() {
        let contents = "{\"id\":\"bd-a\",\"title\":\"A\"}\n<<<<<<< HEAD\n{\"id\":\"bd-b\"}\n=======\n";
        match parse_journal(contents) {
            Err(JournalError::ConflictMarkers { line }) => assert_eq!(line, 2),
            other => panic!("expected ConflictMarkers, got {other:?}"),
        }
    }

    #[test]
    fn separator_must_be_bare_to_match() {
        // A line of equals signs longer than the marker is content, not a
        // conflict marker.
        let contents = "# ========\n{\"id\":\"bd-a\",\"title\":\"========= not a marker\"}\n";
        assert!(find_conflict_marker(contents).is_none());
        assert_eq!(parse_journal(contents).unwrap().len(), 1);
    }

    #[test]
    fn roundtrip_preserves_unknown_fields() {
        let contents = "{\"future_field\":42,\"id\":\"bd-x\",\"title\":\"X\"}\n";
        let records = parse_journal(contents).unwrap();
        let rendered = render_journal(&records).unwrap();
        assert!(rendered.contains("\"future_field\":42"));
    }

    #[test]
    fn render_then_parse_is_identity() {
        let a = IssueBuilder::new("A").id("bd-ra").labels(vec!["x".into()]).build();
        let b = IssueBuilder::new("B").id("bd-rb").priority(1).build();
        let rendered = render_journal(&[a.clone(), b.clone()]).unwrap();
        let parsed = parse_journal(&rendered).unwrap();
        assert_eq!(parsed, vec![a, b]);

        // And a second render is bytewise identical.
        assert_eq!(render_journal(&parsed).unwrap(), rendered);
    }

    #[test]
    fn line_id_extraction() {
        assert_eq!(
            line_id("{\"id\":\"bd-z\",\"title\":\"T\"}"),
            Some("bd-z".to_string())
        );
        assert_eq!(line_id("not json"), None);
    }
}
