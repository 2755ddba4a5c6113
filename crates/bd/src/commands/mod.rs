//! Command handlers for the `bd` CLI.

pub mod blocked;
pub mod close;
pub mod comment;
pub mod create;
pub mod delete;
pub mod dep;
pub mod events;
pub mod export;
pub mod flush_cmd;
pub mod import;
pub mod init;
pub mod label;
pub mod list;
pub mod merge_driver;
pub mod ready;
pub mod rename;
pub mod show;
pub mod stats;
pub mod sync_cmd;
pub mod update;
