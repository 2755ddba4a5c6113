//! Configuration types and loading for the beads system.
//!
//! The main entry point is [`BeadsConfig`], which represents the contents
//! of `.beads/config.yaml`. All fields use serde defaults so a partially
//! specified file deserializes with sensible values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Name of the config file inside `.beads/`.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration file contained invalid YAML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// The `.beads/` directory was not found.
    #[error("no .beads directory found (run 'bd init' first)")]
    BeadsDirNotFound,
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Flush coordinator configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlushConfig {
    /// Debounce window in seconds between a mutation and the journal
    /// export it triggers.
    #[serde(default = "default_debounce_seconds", rename = "debounce-seconds")]
    pub debounce_seconds: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: default_debounce_seconds(),
        }
    }
}

fn default_debounce_seconds() -> u64 {
    5
}

/// Sync engine configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Days a tombstone survives before being purged from the journal.
    #[serde(default = "default_tombstone_ttl_days", rename = "tombstone-ttl-days")]
    pub tombstone_ttl_days: i64,

    /// Hours of local/remote timestamp divergence before a clock-skew
    /// warning event is emitted.
    #[serde(default = "default_clock_skew_warn_hours", rename = "clock-skew-warn-hours")]
    pub clock_skew_warn_hours: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tombstone_ttl_days: default_tombstone_ttl_days(),
            clock_skew_warn_hours: default_clock_skew_warn_hours(),
        }
    }
}

fn default_tombstone_ttl_days() -> i64 {
    30
}

fn default_clock_skew_warn_hours() -> i64 {
    24
}

/// Git-related configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Timeout for individual git subprocesses, in seconds.
    #[serde(default = "default_git_timeout_seconds", rename = "timeout-seconds")]
    pub timeout_seconds: u64,

    /// Disable git push during sync (pull + merge + commit only).
    #[serde(default, rename = "no-push")]
    pub no_push: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_git_timeout_seconds(),
            no_push: false,
        }
    }
}

fn default_git_timeout_seconds() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// The full beads configuration, corresponding to `.beads/config.yaml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BeadsConfig {
    /// Issue ID prefix (e.g., `"bd"`).
    #[serde(default, rename = "issue-prefix")]
    pub prefix: Option<String>,

    /// Actor identity override.
    #[serde(default)]
    pub actor: Option<String>,

    /// Custom issue statuses (comma-separated).
    #[serde(default, rename = "custom-statuses")]
    pub custom_statuses: String,

    /// Custom issue types (comma-separated).
    #[serde(default, rename = "custom-types")]
    pub custom_types: String,

    /// Flush coordinator settings.
    #[serde(default)]
    pub flush: FlushConfig,

    /// Sync engine settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Git settings.
    #[serde(default)]
    pub git: GitConfig,
}

impl BeadsConfig {
    /// The issue prefix, falling back to `"bd"`.
    pub fn prefix_or_default(&self) -> &str {
        self.prefix.as_deref().unwrap_or("bd")
    }

    /// Custom statuses as a list of trimmed names.
    pub fn custom_status_list(&self) -> Vec<&str> {
        split_list(&self.custom_statuses)
    }

    /// Custom types as a list of trimmed names.
    pub fn custom_type_list(&self) -> Vec<&str> {
        split_list(&self.custom_types)
    }
}

fn split_list(s: &str) -> Vec<&str> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Loads the configuration from `<beads_dir>/config.yaml`.
///
/// A missing file yields the default configuration.
pub fn load_config(beads_dir: &Path) -> Result<BeadsConfig> {
    let path = beads_dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(BeadsConfig::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    let config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

/// Saves the configuration to `<beads_dir>/config.yaml`.
pub fn save_config(beads_dir: &Path, config: &BeadsConfig) -> Result<()> {
    let path = beads_dir.join(CONFIG_FILE_NAME);
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(&path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let c = BeadsConfig::default();
        assert_eq!(c.prefix_or_default(), "bd");
        assert_eq!(c.flush.debounce_seconds, 5);
        assert_eq!(c.sync.tombstone_ttl_days, 30);
        assert_eq!(c.sync.clock_skew_warn_hours, 24);
        assert_eq!(c.git.timeout_seconds, 30);
        assert!(!c.git.no_push);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "issue-prefix: web\nflush:\n  debounce-seconds: 2\n";
        let c: BeadsConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.prefix_or_default(), "web");
        assert_eq!(c.flush.debounce_seconds, 2);
        assert_eq!(c.sync.tombstone_ttl_days, 30);
    }

    #[test]
    fn custom_lists_parse() {
        let c = BeadsConfig {
            custom_statuses: "triaged, needs-review".into(),
            custom_types: "decision".into(),
            ..Default::default()
        };
        assert_eq!(c.custom_status_list(), vec!["triaged", "needs-review"]);
        assert_eq!(c.custom_type_list(), vec!["decision"]);
    }

    #[test]
    fn load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let c = load_config(dir.path()).unwrap();
        assert_eq!(c, BeadsConfig::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = BeadsConfig::default();
        c.prefix = Some("api".into());
        c.git.no_push = true;

        save_config(dir.path(), &c).unwrap();
        let back = load_config(dir.path()).unwrap();
        assert_eq!(back, c);
    }
}
