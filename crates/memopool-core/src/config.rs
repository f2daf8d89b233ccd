//! Configuration for the cache and the dispatcher.
//!
//! Configuration lives in a TOML file with one section per component:
//!
//! ```toml
//! [cache]
//! initial_capacity = 16
//!
//! [dispatch]
//! pool_size = 5
//! failure_policy = "fail-fast"
//! ```
//!
//! Missing files and missing sections fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dispatch::FailurePolicy;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "MEMOPOOL_CONFIG";

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "memopool.toml";

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid pool size (must be > 0).
    #[error("Invalid pool size: must be greater than 0")]
    InvalidPoolSize,

    /// I/O error reading config file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Configuration for [`LazyCache`](crate::LazyCache).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of entries to reserve up front (default: 16).
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

fn default_initial_capacity() -> usize {
    16
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { initial_capacity: default_initial_capacity() }
    }
}

/// Configuration for [`BoundedDispatcher`](crate::BoundedDispatcher).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Maximum number of concurrently running tasks (default: 5).
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// What to do when a task fails (default: fail-fast).
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_pool_size() -> usize {
    5
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { pool_size: default_pool_size(), failure_policy: FailurePolicy::default() }
    }
}

impl DispatchConfig {
    /// Validate the dispatch configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidPoolSize` if `pool_size` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidPoolSize);
        }
        Ok(())
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemopoolConfig {
    /// Cache section.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Dispatch section.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl MemopoolConfig {
    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`.
    ///
    /// Returns defaults if the file does not exist.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from the file named by `MEMOPOOL_CONFIG`, or from
    /// `./memopool.toml` when the variable is unset.
    pub fn discover() -> Result<Self, ConfigError> {
        Self::load(&default_config_path())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch.validate()
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// Path consulted by [`MemopoolConfig::discover`].
#[must_use]
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}
