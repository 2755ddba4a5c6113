//! Dependency types -- relationships between issues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::DependencyType;

/// A directed edge between issues: `issue_id` depends on `depends_on_id`.
///
/// In the journal an edge lives inside its source issue's `deps` array as
/// `{to, kind, created_at, ...}`; the source id is implied by the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// The issue holding the edge. Implied by the enclosing journal record.
    #[serde(skip)]
    pub issue_id: String,

    /// The target issue (serialized as "to").
    #[serde(rename = "to")]
    pub depends_on_id: String,

    /// Edge kind (serialized as "kind").
    #[serde(rename = "kind", default)]
    pub dep_type: DependencyType,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,
}

impl Dependency {
    /// Creates an edge with the given endpoints and kind, stamped now.
    pub fn new(
        issue_id: impl Into<String>,
        depends_on_id: impl Into<String>,
        dep_type: DependencyType,
    ) -> Self {
        Self {
            issue_id: issue_id.into(),
            depends_on_id: depends_on_id.into(),
            dep_type,
            created_at: Utc::now(),
            created_by: String::new(),
        }
    }

    /// Edge identity for union/dedup: `(to, kind)` within a source issue.
    pub fn key(&self) -> (String, String) {
        (
            self.depends_on_id.clone(),
            self.dep_type.as_str().to_owned(),
        )
    }
}

/// Keywords that indicate an issue was closed due to failure.
///
/// A conditional-blocks edge only goes live when its target closed with a
/// failure reason.
pub const FAILURE_CLOSE_KEYWORDS: &[&str] = &[
    "failed",
    "rejected",
    "wontfix",
    "won't fix",
    "canceled",
    "cancelled",
    "abandoned",
    "error",
    "timeout",
    "aborted",
];

/// Returns `true` if the close reason indicates the issue failed.
pub fn is_failure_close(close_reason: &str) -> bool {
    if close_reason.is_empty() {
        return false;
    }
    let lower = close_reason.to_lowercase();
    FAILURE_CLOSE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_serde_roundtrip() {
        let dep = Dependency::new("bd-abc", "bd-def", DependencyType::Blocks);

        let json = serde_json::to_string(&dep).unwrap();
        assert!(json.contains(r#""to":"bd-def""#));
        assert!(json.contains(r#""kind":"blocks""#));

        let back: Dependency = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dep_type, DependencyType::Blocks);
        assert_eq!(back.depends_on_id, "bd-def");
        // issue_id is implied by the enclosing record and not serialized.
        assert!(back.issue_id.is_empty());
    }

    #[test]
    fn dependency_key_identity() {
        let a = Dependency::new("x", "y", DependencyType::Blocks);
        let mut b = Dependency::new("x", "y", DependencyType::Blocks);
        b.created_at = Utc::now();
        assert_eq!(a.key(), b.key());

        let c = Dependency::new("x", "y", DependencyType::Related);
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn failure_close_detection() {
        assert!(is_failure_close("Build failed"));
        assert!(is_failure_close("wontfix"));
        assert!(is_failure_close("REJECTED by reviewer"));
        assert!(is_failure_close("Cancelled by user"));
        assert!(!is_failure_close(""));
        assert!(!is_failure_close("Completed successfully"));
    }
}
