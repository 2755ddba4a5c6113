//! DDL statements and migrations for the SQLite schema.
//!
//! Timestamps are stored as TEXT in ISO 8601 format (SQLite has no native
//! datetime type). Booleans are stored as INTEGER (0/1). JSON blobs are
//! TEXT.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed while bringing a store's schema up to
/// date on open.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Issues table --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS issues (
        id            TEXT PRIMARY KEY,
        content_hash  TEXT NOT NULL DEFAULT '',
        title         TEXT NOT NULL,
        description   TEXT NOT NULL DEFAULT '',
        spec_id       TEXT NOT NULL DEFAULT '',
        status        TEXT NOT NULL DEFAULT 'open',
        priority      INTEGER NOT NULL DEFAULT 2,
        issue_type    TEXT NOT NULL DEFAULT 'task',
        assignee      TEXT NOT NULL DEFAULT '',
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        created_by    TEXT NOT NULL DEFAULT '',
        updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        closed_at     TEXT,
        close_reason  TEXT NOT NULL DEFAULT '',
        ephemeral     INTEGER NOT NULL DEFAULT 0,
        is_template   INTEGER NOT NULL DEFAULT 0,
        await_type    TEXT NOT NULL DEFAULT '',
        await_id      TEXT NOT NULL DEFAULT '',
        source_repo   TEXT NOT NULL DEFAULT '',
        external_ref  TEXT,
        metadata      TEXT,
        extra         TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    // -- Indexes on issues ---------------------------------------------------
    "CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status)",
    "CREATE INDEX IF NOT EXISTS idx_issues_priority ON issues(priority)",
    "CREATE INDEX IF NOT EXISTS idx_issues_assignee ON issues(assignee)",
    "CREATE INDEX IF NOT EXISTS idx_issues_spec_id ON issues(spec_id)",
    "CREATE INDEX IF NOT EXISTS idx_issues_updated_at ON issues(updated_at)",
    // -- Dependencies table --------------------------------------------------
    // depends_on_id deliberately has no foreign key: edges may reference
    // issues that arrive later through sync.
    r#"
    CREATE TABLE IF NOT EXISTS dependencies (
        issue_id      TEXT NOT NULL,
        depends_on_id TEXT NOT NULL,
        type          TEXT NOT NULL DEFAULT 'blocks',
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        created_by    TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (issue_id, depends_on_id, type),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE ON UPDATE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_dependencies_issue ON dependencies(issue_id)",
    "CREATE INDEX IF NOT EXISTS idx_dependencies_depends_on ON dependencies(depends_on_id)",
    "CREATE INDEX IF NOT EXISTS idx_dependencies_depends_on_type ON dependencies(depends_on_id, type)",
    // -- Labels table --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS labels (
        issue_id TEXT NOT NULL,
        label    TEXT NOT NULL,
        PRIMARY KEY (issue_id, label),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE ON UPDATE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_labels_label ON labels(label)",
    // -- Comments table ------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id   TEXT NOT NULL,
        idx        INTEGER NOT NULL,
        author     TEXT NOT NULL,
        text       TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        UNIQUE (issue_id, idx),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE ON UPDATE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_comments_issue ON comments(issue_id)",
    // -- Events table (audit trail) ------------------------------------------
    // No foreign key: the audit trail outlives deleted issues, and
    // sync-produced events may reference ids not imported yet.
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id    TEXT NOT NULL,
        event_type  TEXT NOT NULL,
        actor       TEXT NOT NULL,
        old_value   TEXT,
        new_value   TEXT,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_events_issue ON events(issue_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at)",
    // -- Blocked cache -------------------------------------------------------
    // Materialized set of currently-blocked issue ids, rebuilt inside any
    // transaction that changes a blocking edge or a status.
    r#"
    CREATE TABLE IF NOT EXISTS blocked_cache (
        issue_id TEXT PRIMARY KEY
    )
    "#,
    // -- Dirty set -----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS dirty_issues (
        issue_id TEXT PRIMARY KEY
    )
    "#,
    // -- Tombstones ----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS tombstones (
        id         TEXT PRIMARY KEY,
        deleted_at TEXT NOT NULL,
        deleted_by TEXT NOT NULL DEFAULT ''
    )
    "#,
    // -- Config table --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS config (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    // -- Metadata table ------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Default configuration values inserted on first init.
pub const DEFAULT_CONFIG: &[(&str, &str)] = &[("issue_prefix", "bd")];

/// Schema migrations applied after initial DDL.
///
/// Each migration is a `(name, sql)` pair, applied in order inside its own
/// transaction. Migrations are tracked in the `metadata` table under the
/// key `migration:<name>` so they run at most once; a failed migration
/// rolls back and leaves the version pointer untouched.
pub const MIGRATIONS: &[(&str, &str)] = &[
    // Future migrations go here, e.g.:
    // ("001_add_due_at", "ALTER TABLE issues ADD COLUMN due_at TEXT"),
];
