//! End-to-end tests for the `bd` binary against a temporary git repo.

use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;

/// A temp git repository to run `bd` in.
struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        run_git(&root, &["init", "-q"]);
        run_git(&root, &["config", "user.email", "test@example.com"]);
        run_git(&root, &["config", "user.name", "tester"]);
        Self { _dir: dir, root }
    }

    fn bd(&self) -> Command {
        let mut cmd = Command::cargo_bin("bd").unwrap();
        cmd.current_dir(&self.root)
            .env("BD_ACTOR", "tester")
            .env_remove("BEADS_DIR")
            .env_remove("BEADS_DB");
        cmd
    }

    fn init(&self) {
        self.bd().arg("init").assert().success();
    }

    /// Creates an issue and returns its generated id.
    fn create(&self, title: &str) -> String {
        let output = self
            .bd()
            .args(["--json", "create", title])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        value["id"].as_str().unwrap().to_string()
    }

    fn journal(&self) -> String {
        std::fs::read_to_string(self.root.join(".beads/issues.jsonl")).unwrap()
    }
}

fn run_git(cwd: &Path, args: &[&str]) {
    let status = StdCommand::new("git")
        .args(args)
        .current_dir(cwd)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn init_creates_workspace_layout() {
    let ws = Workspace::new();
    ws.bd()
        .args(["init", "--prefix", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    assert!(ws.root.join(".beads/beads.db").exists());
    assert!(ws.root.join(".beads/issues.jsonl").exists());
    assert!(ws.root.join(".beads/config.yaml").exists());
    assert!(ws.root.join(".beads/.gitignore").exists());
}

#[test]
fn requires_workspace() {
    let ws = Workspace::new();
    // No bd init: any store command must fail with the precondition code.
    ws.bd()
        .args(["list"])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains(".beads"));
}

#[test]
fn create_flushes_to_journal_on_exit() {
    let ws = Workspace::new();
    ws.init();

    let id = ws.create("First issue");
    assert!(id.starts_with("bd-"));

    // The command exits through a final flush, so the journal already
    // reflects the new issue.
    let journal = ws.journal();
    assert!(journal.contains(&id));
    assert!(journal.contains("First issue"));
}

#[test]
fn list_and_show() {
    let ws = Workspace::new();
    ws.init();
    let id = ws.create("Visible issue");

    ws.bd()
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Visible issue"));

    ws.bd()
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Visible issue"));
}

#[test]
fn ready_flow_with_blocking_dependency() {
    let ws = Workspace::new();
    ws.init();
    let a = ws.create("Blocker");
    let b = ws.create("Blocked work");

    ws.bd().args(["dep", "add", &b, &a]).assert().success();

    // Only the blocker is ready.
    ws.bd()
        .args(["ready"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocker").and(predicate::str::contains("Blocked work").not()));

    ws.bd()
        .args(["blocked"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocked work"));

    // Closing the blocker frees the dependent.
    ws.bd().args(["close", &a]).assert().success();
    ws.bd()
        .args(["ready"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocked work"));

    // Reopening restores the block.
    ws.bd().args(["reopen", &a]).assert().success();
    ws.bd()
        .args(["ready"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocked work").not());
}

#[test]
fn dependency_cycle_is_rejected() {
    let ws = Workspace::new();
    ws.init();
    let a = ws.create("A");
    let b = ws.create("B");

    ws.bd().args(["dep", "add", &a, &b]).assert().success();
    ws.bd()
        .args(["dep", "add", &b, &a])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
}

#[test]
fn delete_requires_force() {
    let ws = Workspace::new();
    ws.init();
    let id = ws.create("Precious");

    ws.bd().args(["delete", &id]).assert().failure();
    ws.bd().args(["delete", &id, "--force"]).assert().success();

    // The journal now carries a tombstone instead of the issue.
    let journal = ws.journal();
    assert!(journal.contains("\"tombstone\":true"));
}

#[test]
fn import_refuses_conflict_markers_with_code_3() {
    let ws = Workspace::new();
    ws.init();
    ws.create("Survivor");

    std::fs::write(
        ws.root.join(".beads/issues.jsonl"),
        "<<<<<<< HEAD\n{\"id\":\"bd-x\",\"title\":\"theirs\"}\n=======\n>>>>>>> other\n",
    )
    .unwrap();

    ws.bd()
        .args(["import"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("conflict markers"));

    // The store is untouched.
    ws.bd()
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Survivor"));
}

#[test]
fn update_and_events() {
    let ws = Workspace::new();
    ws.init();
    let id = ws.create("Original");

    ws.bd()
        .args(["update", &id, "--status", "in_progress", "--priority", "1"])
        .assert()
        .success();

    ws.bd()
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("in_progress"));

    ws.bd()
        .args(["events", &id])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("created").and(predicate::str::contains("status_changed")),
        );
}

#[test]
fn comment_and_label_roundtrip() {
    let ws = Workspace::new();
    ws.init();
    let id = ws.create("Discussed");

    ws.bd()
        .args(["comment", &id, "first note"])
        .assert()
        .success();
    ws.bd()
        .args(["label", "add", &id, "backend"])
        .assert()
        .success();

    ws.bd()
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("first note").and(predicate::str::contains("backend")));
}

#[test]
fn export_import_are_idempotent() {
    let ws = Workspace::new();
    ws.init();
    ws.create("Stable");

    ws.bd().args(["export", "--full"]).assert().success();
    let first = ws.journal();

    ws.bd()
        .args(["import"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 changed"));

    ws.bd().args(["export", "--full"]).assert().success();
    assert_eq!(first, ws.journal());
}

#[test]
fn stats_counts_issues() {
    let ws = Workspace::new();
    ws.init();
    ws.create("One");
    ws.create("Two");

    ws.bd()
        .args(["--json", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 2"));
}
