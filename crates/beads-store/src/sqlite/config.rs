//! Config and metadata key-value operations for [`SqliteStore`].
//!
//! `config` holds user-visible settings (issue prefix); `metadata` holds
//! internal bookkeeping: export hashes, the journal hash, import markers,
//! and migration tracking.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::sqlite::store::SqliteStore;

/// Metadata key for the per-issue export hash map (JSON object).
pub const META_EXPORT_HASHES: &str = "export_hashes";

/// Metadata key for the hash of the journal as last written by us.
pub const META_JOURNAL_HASH: &str = "journal_hash";

/// Metadata key for the last import timestamp.
pub const META_LAST_IMPORT_TIME: &str = "last_import_time";

/// Metadata key for the hash of the last imported journal.
pub const META_LAST_IMPORT_HASH: &str = "last_import_hash";

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

pub(crate) fn set_config_on_conn(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

pub(crate) fn get_config_on_conn(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM config WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub(crate) fn set_metadata_on_conn(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

pub(crate) fn get_metadata_on_conn(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub(crate) fn delete_metadata_on_conn(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM metadata WHERE key = ?1", params![key])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn set_config_impl(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        set_config_on_conn(&conn, key, value)
    }

    pub fn get_config_impl(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        get_config_on_conn(&conn, key)
    }

    pub fn set_metadata_impl(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        set_metadata_on_conn(&conn, key, value)
    }

    pub fn get_metadata_impl(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        get_metadata_on_conn(&conn, key)
    }

    pub fn delete_metadata_impl(&self, key: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        delete_metadata_on_conn(&conn, key)
    }
}
