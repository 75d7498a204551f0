//! Generator configuration, loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::DEFAULT_GENERIC_PREFIX;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("storage")
}

fn default_generic_prefix() -> String {
    DEFAULT_GENERIC_PREFIX.to_string()
}

fn default_eviction_days() -> u64 {
    7
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_corner_radius() -> u32 {
    15
}

fn default_user_agent() -> String {
    "QR-Generator-API/1.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the `structured/` and `generic/` partitions
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    #[serde(default = "default_generic_prefix")]
    pub generic_prefix: String,

    /// Default age threshold for generic eviction
    #[serde(default = "default_eviction_days")]
    pub eviction_days: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            generic_prefix: default_generic_prefix(),
            eviction_days: default_eviction_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    #[serde(default = "default_corner_radius")]
    pub corner_radius: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_bytes: default_max_bytes(),
            corner_radius: default_corner_radius(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logo: LogoConfig,
}

impl GeneratorConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserialises to unit, not an empty map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logo.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("logo.fetch_timeout_secs must be positive".into()));
        }
        if self.logo.max_bytes == 0 {
            return Err(ConfigError::Invalid("logo.max_bytes must be positive".into()));
        }
        let prefix_ok = !self.storage.generic_prefix.is_empty()
            && self.storage.generic_prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !prefix_ok {
            return Err(ConfigError::Invalid(format!(
                "storage.generic_prefix {:?} must be non-empty alphanumeric",
                self.storage.generic_prefix
            )));
        }
        Ok(())
    }
}
