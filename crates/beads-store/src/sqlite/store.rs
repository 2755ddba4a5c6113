//! [`SqliteStore`] -- SQLite-backed storage implementation.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::sqlite::schema;

/// SQLite-backed implementation of the [`Storage`](crate::traits::Storage)
/// trait.
///
/// A single [`rusqlite::Connection`] behind a `Mutex` serves every
/// operation; the guard is held for the duration of the SQL statements
/// only, never across file or git I/O. `active` is the lifecycle flag:
/// once `close()` clears it, every subsequent lock attempt fails with
/// [`StorageError::StoreInactive`] instead of touching the connection.
pub struct SqliteStore {
    pub(crate) conn: Mutex<Connection>,
    pub(crate) active: AtomicBool,
}

impl SqliteStore {
    /// Opens the database file, creating it (and the schema) on first
    /// use.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "opening store");

        let conn = Connection::open(path).map_err(|e| {
            StorageError::Connection(format!("failed to open {}: {e}", path.display()))
        })?;
        Self::from_connection(conn)
    }

    /// Opens a store backed by a throwaway in-memory database. Tests use
    /// this to get full schema behavior without touching disk.
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory store");
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("failed to open in-memory db: {e}")))?;
        Self::from_connection(conn)
    }

    /// Shared construction path: pragmas, then schema, then migrations.
    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            active: AtomicBool::new(true),
        };
        store.apply_pragmas()?;
        store.ensure_schema()?;
        Ok(store)
    }

    /// Connection-level settings: WAL so concurrent readers never block
    /// the writer, enforced foreign keys, and a bounded wait on a locked
    /// database instead of an immediate SQLITE_BUSY.
    fn apply_pragmas(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| StorageError::Connection(format!("failed to set pragmas: {e}")))?;
        Ok(())
    }

    /// Brings the schema up to [`schema::CURRENT_SCHEMA_VERSION`].
    ///
    /// Safe to run on every open: an up-to-date store returns early, DDL
    /// uses `IF NOT EXISTS`, default config rows use `INSERT OR IGNORE`,
    /// and migrations are tracked so they apply at most once.
    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        let version = recorded_schema_version(&conn);
        if version >= schema::CURRENT_SCHEMA_VERSION {
            debug!(version, "schema is current");
            return Ok(());
        }

        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt).map_err(|e| StorageError::Migration {
                name: "schema_ddl".into(),
                reason: format!("{e}\nStatement: {}", sql_snippet(stmt)),
            })?;
        }

        for &(key, value) in schema::DEFAULT_CONFIG {
            conn.execute(
                "INSERT OR IGNORE INTO config (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .map_err(|e| StorageError::Migration {
                name: "default_config".into(),
                reason: format!("failed to insert {key}: {e}"),
            })?;
        }

        Self::apply_migrations(&conn)?;

        conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES ('schema_version', ?1)",
            rusqlite::params![schema::CURRENT_SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| StorageError::Migration {
            name: "schema_version".into(),
            reason: e.to_string(),
        })?;

        info!(
            version = schema::CURRENT_SCHEMA_VERSION,
            "schema initialized"
        );
        Ok(())
    }

    /// Runs each pending migration inside its own transaction. The
    /// tracking row commits with the migration's DDL, so a failure rolls
    /// both back and the version pointer is untouched.
    fn apply_migrations(conn: &Connection) -> Result<()> {
        for &(name, sql) in schema::MIGRATIONS {
            let key = format!("migration:{name}");
            let applied: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM metadata WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get::<_, i32>(0),
                )
                .unwrap_or(0)
                > 0;
            if applied {
                debug!(name, "migration already applied");
                continue;
            }

            debug!(name, "applying migration");
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| StorageError::Transaction(format!("failed to begin: {e}")))?;
            tx.execute_batch(sql).map_err(|e| StorageError::Migration {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, "applied"],
            )
            .map_err(|e| StorageError::Migration {
                name: name.to_string(),
                reason: format!("failed to mark migration: {e}"),
            })?;
            tx.commit().map_err(|e| StorageError::Migration {
                name: name.to_string(),
                reason: format!("failed to commit: {e}"),
            })?;
        }
        Ok(())
    }

    /// Acquires the connection lock, failing once the store is closed.
    /// Helper used by all operation modules.
    pub(crate) fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(StorageError::StoreInactive);
        }
        self.conn
            .lock()
            .map_err(|e| StorageError::Connection(format!("mutex poisoned: {e}")))
    }

    /// Marks the store closed.
    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Returns `true` while the store accepts operations.
    pub(crate) fn active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("active", &self.active())
            .finish_non_exhaustive()
    }
}

/// The stored schema version, or 0 when the config table does not exist
/// yet (fresh database).
fn recorded_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT value FROM config WHERE key = 'schema_version'",
        [],
        |row| row.get::<_, String>(0),
    )
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(0)
}

/// First line's worth of a DDL statement, for error messages.
fn sql_snippet(sql: &str) -> &str {
    let trimmed = sql.trim_start();
    match trimmed.char_indices().nth(120) {
        Some((cut, _)) => &trimmed[..cut],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every table the rest of the crate relies on must exist after a
    /// fresh open.
    #[test]
    fn fresh_store_creates_all_tables() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();

        for table in [
            "issues",
            "dependencies",
            "labels",
            "comments",
            "events",
            "blocked_cache",
            "dirty_issues",
            "tombstones",
            "config",
            "metadata",
        ] {
            let found: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    rusqlite::params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "missing table {table}");
        }
    }

    #[test]
    fn reopen_skips_init_and_keeps_config() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("beads.db");

        {
            let store = SqliteStore::open(&db).unwrap();
            store.set_config_impl("issue_prefix", "web").unwrap();
        }

        // Second open takes the version-check early return and must not
        // reset anything.
        let store = SqliteStore::open(&db).unwrap();
        assert_eq!(
            store.get_config_impl("issue_prefix").unwrap(),
            Some("web".to_string())
        );
        {
            let conn = store.lock_conn().unwrap();
            assert_eq!(
                recorded_schema_version(&conn),
                schema::CURRENT_SCHEMA_VERSION
            );
            // Default rows were not duplicated.
            let prefixes: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM config WHERE key = 'issue_prefix'",
                    [],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(prefixes, 1);
        }
    }

    #[test]
    fn closed_store_rejects_operations() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.deactivate();
        let err = store.lock_conn().unwrap_err();
        assert!(matches!(err, StorageError::StoreInactive));
    }

    #[test]
    fn sql_snippet_bounds_long_statements() {
        let long = format!("SELECT {}", "x,".repeat(200));
        assert_eq!(sql_snippet(&long).chars().count(), 120);
        assert_eq!(sql_snippet("SELECT 1"), "SELECT 1");
    }
}
