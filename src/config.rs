//! Configuration loading and management
//!
//! Handles parsing of `taskdeck.toml` configuration files. Configuration
//! only influences construction-time choices (where the file-backed store
//! lives); nothing is reconfigurable at runtime.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the configuration file looked up next to the caller.
pub const CONFIG_FILE: &str = "taskdeck.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store file the file-backed manager is bound to
    #[serde(default = "default_store_file")]
    pub file: PathBuf,
}

fn default_store_file() -> PathBuf {
    PathBuf::from("tasks.csv")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file: default_store_file(),
        }
    }
}

impl Config {
    /// Load configuration from a `taskdeck.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|err| Error::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults when no
    /// usable file is present
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.storage.file.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "storage.file cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
