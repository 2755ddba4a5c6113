//! Filter types for querying issues.

use chrono::{DateTime, Utc};

use crate::enums::{IssueType, SortPolicy, Status};

/// Filter for issue list queries.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<Status>,
    pub priority: Option<i32>,
    pub issue_type: Option<IssueType>,
    pub assignee: Option<String>,

    /// AND semantics: issue must have ALL these labels.
    pub labels: Vec<String>,
    /// OR semantics: issue must have AT LEAST ONE of these labels.
    pub labels_any: Vec<String>,

    /// Filter by specific issue IDs.
    pub ids: Vec<String>,
    /// Filter by ID prefix (e.g., "bd-" to match "bd-abc123").
    pub id_prefix: Option<String>,
    /// Filter by spec_id prefix.
    pub spec_id_prefix: Option<String>,

    pub title_contains: Option<String>,
    pub description_contains: Option<String>,

    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,

    pub no_assignee: bool,
    pub no_labels: bool,

    /// Filter by source_repo field (None = any).
    pub source_repo: Option<String>,

    /// Filter by parent issue (via parent-child dependency).
    pub parent_id: Option<String>,

    /// Exclude issues with these statuses.
    pub exclude_status: Vec<Status>,

    pub limit: Option<i32>,
}

/// Filter for ready / blocked work queries.
#[derive(Debug, Clone, Default)]
pub struct WorkFilter {
    pub issue_type: Option<IssueType>,
    pub priority: Option<i32>,
    pub assignee: Option<String>,
    /// Filter for issues with no assignee.
    pub unassigned: bool,

    /// AND semantics: issue must have ALL these labels.
    pub labels: Vec<String>,
    /// OR semantics: issue must have AT LEAST ONE of these labels.
    pub labels_any: Vec<String>,

    pub limit: Option<i32>,
    pub sort_policy: SortPolicy,

    /// If true, include ephemeral issues.
    pub include_ephemeral: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_filter_defaults() {
        let f = IssueFilter::default();
        assert!(f.status.is_none());
        assert!(f.priority.is_none());
        assert!(f.labels.is_empty());
        assert!(f.limit.is_none());
    }

    #[test]
    fn work_filter_defaults() {
        let f = WorkFilter::default();
        assert_eq!(f.sort_policy, SortPolicy::Hybrid);
        assert!(!f.unassigned);
        assert!(!f.include_ephemeral);
    }
}
