//! Configuration management for the beads system.

pub mod beads_dir;
pub mod config;

pub use beads_dir::{ensure_beads_dir, find_beads_dir};
pub use config::{BeadsConfig, ConfigError, load_config, save_config};
