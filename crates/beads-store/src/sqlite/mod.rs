//! SQLite storage backend.

pub mod blocked_cache;
pub mod comments;
pub mod config;
pub mod dependencies;
pub mod dirty;
pub mod issues;
pub mod labels;
pub mod queries;
pub mod schema;
pub mod store;
pub mod tombstones;
pub mod transaction;

pub use store::SqliteStore;
