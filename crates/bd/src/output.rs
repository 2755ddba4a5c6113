//! Output helpers: plain text for humans, JSON for machines.

use beads_core::issue::Issue;

/// Prints a serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line issue summary: `id [P2/task/open] title (assignee)`.
pub fn issue_line(issue: &Issue) -> String {
    let mut line = format!(
        "{} [P{}/{}/{}] {}",
        issue.id, issue.priority, issue.issue_type, issue.status, issue.title
    );
    if !issue.assignee.is_empty() {
        line.push_str(&format!(" ({})", issue.assignee));
    }
    line
}

/// Prints a list of issues, one per line, or as a JSON array.
pub fn print_issues(issues: &[Issue], json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&issues)?;
    } else if issues.is_empty() {
        println!("No issues.");
    } else {
        for issue in issues {
            println!("{}", issue_line(issue));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::enums::{IssueType, Status};
    use beads_core::issue::IssueBuilder;

    #[test]
    fn issue_line_format() {
        let issue = IssueBuilder::new("Fix it")
            .id("bd-x1")
            .priority(1)
            .issue_type(IssueType::Bug)
            .status(Status::InProgress)
            .assignee("alice")
            .build();
        assert_eq!(issue_line(&issue), "bd-x1 [P1/bug/in_progress] Fix it (alice)");
    }

    #[test]
    fn issue_line_without_assignee() {
        let issue = IssueBuilder::new("Plain").id("bd-x2").build();
        assert_eq!(issue_line(&issue), "bd-x2 [P2/task/open] Plain");
    }
}
