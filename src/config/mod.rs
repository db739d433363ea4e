//! Lab configuration.
//!
//! Reads `<config dir>/fwlab/config.toml`. A missing file yields defaults, so
//! a fresh checkout works without any setup:
//!
//! ```toml
//! state_path = "/tmp/fwlab/device_state.json"
//!
//! [hashing]
//! memory_kib = 19456
//! iterations = 2
//! parallelism = 1
//!
//! [policy]
//! min_length = 12
//! require_symbol = true
//!
//! [log]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::security::{HashParams, PasswordPolicy};

/// Name of the state file inside the data directory.
pub const STATE_FILE_NAME: &str = "device_state.json";

const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "fwlab")
}

/// `[log]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Device state file. Falls back to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
    pub hashing: HashParams,
    pub policy: PasswordPolicy,
    pub log: LogConfig,
}

impl LabConfig {
    /// Default config file path, e.g. `~/.config/fwlab/config.toml` on Linux.
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(".fwlab").join(CONFIG_FILE_NAME))
    }

    /// Load config from disk, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config
            .hashing
            .hasher()
            .with_context(|| format!("Invalid [hashing] section in {}", path.display()))?;
        Ok(config)
    }

    /// Write config to disk, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to encode config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Where the device state lives: explicit override, then the config
    /// file, then the platform data directory.
    pub fn state_path(&self, cli_override: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_override {
            return path.to_path_buf();
        }
        if let Some(path) = &self.state_path {
            return path.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join(STATE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(".fwlab").join(STATE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = LabConfig::load(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, LabConfig::default());
        assert_eq!(config.policy.min_length, 12);
        assert_eq!(config.hashing.memory_kib, 19456);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "state_path = \"/tmp/lab/state.json\"\n\n[policy]\nmin_length = 16\n",
        )
        .unwrap();

        let config = LabConfig::load(&path).unwrap();
        assert_eq!(config.state_path, Some(PathBuf::from("/tmp/lab/state.json")));
        assert_eq!(config.policy.min_length, 16);
        assert!(config.policy.require_symbol);
        assert_eq!(config.hashing, HashParams::default());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[policy\nmin_length = ").unwrap();
        assert!(LabConfig::load(&path).is_err());
    }

    #[test]
    fn unusable_hash_cost_is_rejected_at_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[hashing]\nparallelism = 0\n").unwrap();

        let err = LabConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("[hashing]"));
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let mut config = LabConfig::default();
        config.state_path = Some(tmp.path().join("state.json"));
        config.log.level = "fwlab=debug".into();

        config.save(&path).unwrap();
        assert_eq!(LabConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn state_path_prefers_override_then_file() {
        let mut config = LabConfig::default();
        config.state_path = Some(PathBuf::from("/from/config.json"));

        assert_eq!(
            config.state_path(Some(Path::new("/from/cli.json"))),
            PathBuf::from("/from/cli.json")
        );
        assert_eq!(config.state_path(None), PathBuf::from("/from/config.json"));
    }

    #[test]
    fn default_state_path_uses_state_file_name() {
        let path = LabConfig::default().state_path(None);
        assert!(path.ends_with(STATE_FILE_NAME));
    }
}
