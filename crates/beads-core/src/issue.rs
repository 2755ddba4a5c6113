//! Issue struct -- the central domain model for the beads system.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dependency::Dependency;
use crate::enums::{IssueType, Status};

/// Helper for `skip_serializing_if` on `bool` fields.
fn is_false(b: &bool) -> bool {
    !b
}

/// Helper for `skip_serializing_if` on `Vec` fields.
fn is_empty_vec<T>(v: &Vec<T>) -> bool {
    v.is_empty()
}

/// Represents a trackable work item.
///
/// The serialized form is the journal record: one JSON object per line in
/// `issues.jsonl`. Fields that are at their default are omitted so that
/// journal diffs stay small. Unknown fields survive a round-trip through
/// the `extra` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    // ===== Identity =====
    #[serde(default)]
    pub id: String,

    /// Internal: SHA-256 of canonical content, used for export-hash
    /// tracking. Never written to the journal.
    #[serde(skip)]
    pub content_hash: String,

    // ===== Content =====
    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub spec_id: String,

    // ===== Status & workflow =====
    #[serde(default, skip_serializing_if = "Status::is_default")]
    pub status: Status,

    /// Priority 0-4, where 0 is the most urgent. 0 is a valid value and is
    /// always serialized.
    #[serde(default)]
    pub priority: i32,

    #[serde(rename = "type", default, skip_serializing_if = "IssueType::is_default")]
    pub issue_type: IssueType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub assignee: String,

    // ===== Timestamps =====
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_by: String,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub close_reason: String,

    // ===== Workflow flags =====
    #[serde(default, skip_serializing_if = "is_false")]
    pub ephemeral: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_template: bool,

    // ===== Gate / wait state =====
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub await_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub await_id: String,

    // ===== External linkage =====
    /// Which workspace the issue originated in (provenance).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_repo: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,

    /// Arbitrary JSON data for extension points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    // ===== Relational data (hydrated for export/import) =====
    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub labels: Vec<String>,

    #[serde(rename = "deps", default, skip_serializing_if = "is_empty_vec")]
    pub dependencies: Vec<Dependency>,

    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub comments: Vec<crate::comment::Comment>,

    // ===== Deletion marker (sync) =====
    #[serde(default, skip_serializing_if = "is_false")]
    pub tombstone: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deleted_by: String,

    // ===== Forward compatibility =====
    /// Fields this version does not know about, preserved verbatim so a
    /// re-export does not lose them. An empty map flattens to nothing.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Issue {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            content_hash: String::new(),
            title: String::new(),
            description: String::new(),
            spec_id: String::new(),
            status: Status::Open,
            priority: 2,
            issue_type: IssueType::Task,
            assignee: String::new(),
            created_at: now,
            created_by: String::new(),
            updated_at: now,
            closed_at: None,
            close_reason: String::new(),
            ephemeral: false,
            is_template: false,
            await_type: String::new(),
            await_id: String::new(),
            source_repo: String::new(),
            external_ref: None,
            metadata: None,
            labels: Vec::new(),
            dependencies: Vec::new(),
            comments: Vec::new(),
            tombstone: false,
            deleted_at: None,
            deleted_by: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl Issue {
    /// Applies default values for fields omitted during journal import.
    pub fn set_defaults(&mut self) {
        if self.status.as_str().is_empty() {
            self.status = Status::Open;
        }
        if self.issue_type.as_str().is_empty() {
            self.issue_type = IssueType::Task;
        }
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }
    }

    /// Returns the parent issue id, if a parent-child edge is hydrated.
    pub fn parent_id(&self) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| d.dep_type == crate::enums::DependencyType::ParentChild)
            .map(|d| d.depends_on_id.as_str())
    }

    /// Returns `true` if this record marks a deletion rather than a live
    /// issue.
    pub fn is_tombstone(&self) -> bool {
        self.tombstone
    }
}

/// Builder for constructing an [`Issue`] with a fluent API.
pub struct IssueBuilder {
    issue: Issue,
}

impl IssueBuilder {
    /// Creates a new builder with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        let mut issue = Issue::default();
        issue.title = title.into();
        Self { issue }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.issue.id = id.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.issue.description = description.into();
        self
    }

    pub fn spec_id(mut self, spec_id: impl Into<String>) -> Self {
        self.issue.spec_id = spec_id.into();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.issue.status = status;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.issue.priority = priority;
        self
    }

    pub fn issue_type(mut self, issue_type: IssueType) -> Self {
        self.issue.issue_type = issue_type;
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.issue.assignee = assignee.into();
        self
    }

    pub fn created_at(mut self, t: DateTime<Utc>) -> Self {
        self.issue.created_at = t;
        self
    }

    pub fn created_by(mut self, by: impl Into<String>) -> Self {
        self.issue.created_by = by.into();
        self
    }

    pub fn updated_at(mut self, t: DateTime<Utc>) -> Self {
        self.issue.updated_at = t;
        self
    }

    pub fn closed_at(mut self, t: DateTime<Utc>) -> Self {
        self.issue.closed_at = Some(t);
        self
    }

    pub fn close_reason(mut self, reason: impl Into<String>) -> Self {
        self.issue.close_reason = reason.into();
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.issue.ephemeral = ephemeral;
        self
    }

    pub fn is_template(mut self, is_template: bool) -> Self {
        self.issue.is_template = is_template;
        self
    }

    pub fn await_state(mut self, await_type: impl Into<String>, await_id: impl Into<String>) -> Self {
        self.issue.await_type = await_type.into();
        self.issue.await_id = await_id.into();
        self
    }

    pub fn source_repo(mut self, repo: impl Into<String>) -> Self {
        self.issue.source_repo = repo.into();
        self
    }

    pub fn external_ref(mut self, ext: impl Into<String>) -> Self {
        self.issue.external_ref = Some(ext.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.issue.metadata = Some(metadata);
        self
    }

    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.issue.labels = labels;
        self
    }

    /// Consumes the builder and returns the constructed [`Issue`].
    pub fn build(self) -> Issue {
        self.issue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_issue() {
        let issue = Issue::default();
        assert_eq!(issue.status, Status::Open);
        assert_eq!(issue.issue_type, IssueType::Task);
        assert_eq!(issue.priority, 2);
        assert!(!issue.is_tombstone());
    }

    #[test]
    fn builder_basic() {
        let issue = IssueBuilder::new("Fix the bug")
            .priority(1)
            .status(Status::InProgress)
            .issue_type(IssueType::Bug)
            .assignee("alice")
            .build();

        assert_eq!(issue.title, "Fix the bug");
        assert_eq!(issue.priority, 1);
        assert_eq!(issue.status, Status::InProgress);
        assert_eq!(issue.issue_type, IssueType::Bug);
        assert_eq!(issue.assignee, "alice");
    }

    #[test]
    fn issue_serde_roundtrip() {
        let issue = IssueBuilder::new("Test issue")
            .id("bd-a1b2c3d4e5f6")
            .priority(1)
            .description("A test description")
            .build();

        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""id":"bd-a1b2c3d4e5f6""#));
        let back: Issue = serde_json::from_str(&json).unwrap();

        assert_eq!(back.title, "Test issue");
        assert_eq!(back.id, "bd-a1b2c3d4e5f6");
        assert_eq!(back.priority, 1);
        assert_eq!(back.description, "A test description");
    }

    #[test]
    fn issue_type_serialized_as_type() {
        let issue = IssueBuilder::new("t").issue_type(IssueType::Bug).build();
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""type":"bug""#));
    }

    #[test]
    fn unknown_fields_roundtrip() {
        let json = r#"{"id":"bd-x","title":"hello","quality_score":0.9,"rig":"alpha"}"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.extra.len(), 2);

        let out = serde_json::to_string(&issue).unwrap();
        assert!(out.contains("quality_score"));
        assert!(out.contains(r#""rig":"alpha""#));
    }

    #[test]
    fn set_defaults_repairs_updated_at() {
        let mut issue = Issue::default();
        issue.updated_at = issue.created_at - chrono::Duration::hours(1);
        issue.set_defaults();
        assert_eq!(issue.updated_at, issue.created_at);
    }

    #[test]
    fn tombstone_flag_roundtrip() {
        let mut issue = IssueBuilder::new("gone").id("bd-dead").build();
        issue.tombstone = true;
        issue.deleted_at = Some(Utc::now());
        issue.deleted_by = "alice".into();

        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""tombstone":true"#));
        let back: Issue = serde_json::from_str(&json).unwrap();
        assert!(back.is_tombstone());
        assert_eq!(back.deleted_by, "alice");
    }
}
