//! Comment, Event, and Label types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::enums::EventType;

/// A comment on an issue.
///
/// Comments are append-only per issue. The `(issue_id, index)` pair is the
/// cross-machine identity used for merge dedup; the content hash is the
/// fallback when two sides numbered independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Local database rowid. Not part of the journal record.
    #[serde(skip)]
    pub id: i64,

    /// Implied by the enclosing journal record.
    #[serde(skip)]
    pub issue_id: String,

    /// Position within the issue's comment stream (0-based).
    #[serde(default)]
    pub index: i32,

    pub author: String,

    pub text: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Content identity used for dedup when indexes disagree.
    pub fn content_key(&self) -> String {
        let mut h = Sha256::new();
        h.update(self.author.as_bytes());
        h.update([0]);
        h.update(self.text.as_bytes());
        h.update([0]);
        h.update(self.created_at.to_rfc3339().as_bytes());
        format!("{:x}", h.finalize())
    }
}

/// An audit trail entry. Append-only, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,

    pub issue_id: String,

    pub event_type: EventType,

    pub actor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A label (tag) on an issue.
///
/// Labels form a set per issue; comparisons are case-sensitive. The `bd:`
/// and `_` namespaces are reserved for core-generated labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub issue_id: String,
    pub label: String,
}

/// Reserved label namespace prefixes.
pub const RESERVED_LABEL_PREFIXES: &[&str] = &["bd:", "_"];

/// Returns `true` if the label uses a reserved namespace.
pub fn is_reserved_label(label: &str) -> bool {
    RESERVED_LABEL_PREFIXES
        .iter()
        .any(|p| label.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_serde_roundtrip() {
        let c = Comment {
            id: 42,
            issue_id: "bd-abc".into(),
            index: 0,
            author: "alice".into(),
            text: "Looks good to me".into(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains(r#""index":0"#));
        let back: Comment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.author, "alice");
        // id and issue_id are local-only.
        assert_eq!(back.id, 0);
        assert!(back.issue_id.is_empty());
    }

    #[test]
    fn comment_content_key_stable() {
        let t = Utc::now();
        let a = Comment {
            id: 1,
            issue_id: "x".into(),
            index: 0,
            author: "alice".into(),
            text: "hi".into(),
            created_at: t,
        };
        let b = Comment {
            id: 9,
            issue_id: "y".into(),
            index: 3,
            author: "alice".into(),
            text: "hi".into(),
            created_at: t,
        };
        assert_eq!(a.content_key(), b.content_key());
    }

    #[test]
    fn event_serde_roundtrip() {
        let e = Event {
            id: 1,
            issue_id: "bd-abc".into(),
            event_type: EventType::StatusChanged,
            actor: "bob".into(),
            old_value: Some("open".into()),
            new_value: Some("closed".into()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&e).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type, EventType::StatusChanged);
        assert_eq!(back.old_value, Some("open".into()));
    }

    #[test]
    fn reserved_labels() {
        assert!(is_reserved_label("bd:pinned"));
        assert!(is_reserved_label("_internal"));
        assert!(!is_reserved_label("tech-debt"));
    }
}
