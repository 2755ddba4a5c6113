//! Issue and edge validation rules.
//!
//! Validation runs at command entry and again inside the store on write.
//! Each error describes exactly one violation; operations are
//! all-or-nothing.

use crate::comment::is_reserved_label;
use crate::enums::Status;
use crate::issue::Issue;

/// Error type for validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    TitleRequired,

    #[error("title must be 500 characters or less (got {0})")]
    TitleTooLong(usize),

    #[error("priority must be between 0 and 4 (got {0})")]
    InvalidPriority(i32),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid issue type: {0}")]
    InvalidIssueType(String),

    #[error("invalid issue id: {0}")]
    InvalidId(String),

    #[error("label '{0}' uses a reserved namespace")]
    ReservedLabel(String),

    #[error("closed issues must have closed_at timestamp")]
    ClosedWithoutTimestamp,

    #[error("non-closed issues cannot have closed_at timestamp")]
    NotClosedWithTimestamp,

    #[error("updated_at must not precede created_at")]
    UpdatedBeforeCreated,

    #[error("an issue cannot depend on itself")]
    SelfDependency,
}

impl ValidationError {
    /// The name of the field that violated a rule.
    pub fn field(&self) -> &'static str {
        match self {
            Self::TitleRequired | Self::TitleTooLong(_) => "title",
            Self::InvalidPriority(_) => "priority",
            Self::InvalidStatus(_) => "status",
            Self::InvalidIssueType(_) => "type",
            Self::InvalidId(_) => "id",
            Self::ReservedLabel(_) => "labels",
            Self::ClosedWithoutTimestamp | Self::NotClosedWithTimestamp => "closed_at",
            Self::UpdatedBeforeCreated => "updated_at",
            Self::SelfDependency => "deps",
        }
    }
}

/// Validates an issue using built-in rules only.
pub fn validate(issue: &Issue) -> Result<(), ValidationError> {
    validate_with_custom(issue, &[], &[])
}

/// Validates an issue, allowing custom statuses and types.
pub fn validate_with_custom(
    issue: &Issue,
    custom_statuses: &[&str],
    custom_types: &[&str],
) -> Result<(), ValidationError> {
    if issue.title.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if issue.title.chars().count() > 500 {
        return Err(ValidationError::TitleTooLong(issue.title.chars().count()));
    }
    if issue.priority < 0 || issue.priority > 4 {
        return Err(ValidationError::InvalidPriority(issue.priority));
    }
    if !issue.status.is_builtin() && !custom_statuses.contains(&issue.status.as_str()) {
        return Err(ValidationError::InvalidStatus(
            issue.status.as_str().to_owned(),
        ));
    }
    if !issue.issue_type.is_builtin() && !custom_types.contains(&issue.issue_type.as_str()) {
        return Err(ValidationError::InvalidIssueType(
            issue.issue_type.as_str().to_owned(),
        ));
    }
    if !issue.id.is_empty() {
        validate_id(&issue.id)?;
    }
    for label in &issue.labels {
        if is_reserved_label(label) {
            return Err(ValidationError::ReservedLabel(label.clone()));
        }
    }
    if issue.status == Status::Closed && issue.closed_at.is_none() {
        return Err(ValidationError::ClosedWithoutTimestamp);
    }
    if issue.status != Status::Closed && issue.closed_at.is_some() {
        return Err(ValidationError::NotClosedWithTimestamp);
    }
    if issue.updated_at < issue.created_at {
        return Err(ValidationError::UpdatedBeforeCreated);
    }
    for dep in &issue.dependencies {
        if !issue.id.is_empty() && dep.depends_on_id == issue.id {
            return Err(ValidationError::SelfDependency);
        }
    }

    Ok(())
}

/// Validates an issue for journal import.
///
/// Imported records are trusted for custom statuses and types (the source
/// workspace already validated them), but structural invariants still hold.
pub fn validate_for_import(issue: &Issue) -> Result<(), ValidationError> {
    if issue.is_tombstone() {
        // Tombstones carry no content; only the id must be well-formed.
        return validate_id(&issue.id);
    }
    if issue.title.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if issue.priority < 0 || issue.priority > 4 {
        return Err(ValidationError::InvalidPriority(issue.priority));
    }
    validate_id(&issue.id)?;
    if issue.status == Status::Closed && issue.closed_at.is_none() {
        return Err(ValidationError::ClosedWithoutTimestamp);
    }
    for dep in &issue.dependencies {
        if dep.depends_on_id == issue.id {
            return Err(ValidationError::SelfDependency);
        }
    }
    Ok(())
}

/// Checks the `{prefix}-{base36}` id shape.
pub fn validate_id(id: &str) -> Result<(), ValidationError> {
    let valid = id.rsplit_once('-').is_some_and(|(prefix, hash)| {
        !prefix.is_empty()
            && !hash.is_empty()
            && hash.chars().all(|c| c.is_ascii_alphanumeric())
    });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidId(id.to_owned()))
    }
}
