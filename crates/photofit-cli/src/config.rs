//! Layered configuration
//!
//! Built-in defaults, then an optional TOML file, then command-line flags.
//! Validation runs on the merged result.

use photofit_core::{BudgetError, CompressionBudget};
use photofit_image::CodecSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config {path}: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Budget values out of range
    #[error("invalid budget: {0}")]
    Budget(#[from] BudgetError),

    /// Logging filter directive rejected
    #[error("invalid log filter {filter:?}: {message}")]
    Filter {
        /// Offending directive
        filter: String,
        /// Parser message
        message: String,
    },

    /// Effective config could not be rendered
    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Output format
    pub format: LogFormat,
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
        }
    }
}

/// Command-line values that override the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--max-bytes`
    pub max_bytes: Option<u64>,
    /// `--scratch-dir`
    pub scratch_dir: Option<PathBuf>,
}

/// Effective configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhotofitConfig {
    /// Size budget and decay schedule
    pub budget: CompressionBudget,
    /// Image codec settings
    pub codec: CodecSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl PhotofitConfig {
    /// Load from `path`, or defaults when no file is given
    ///
    /// # Errors
    /// Returns `ConfigError::Read` or `ConfigError::Parse`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(max_bytes) = overrides.max_bytes {
            self.budget.max_bytes = max_bytes;
        }
        if let Some(dir) = &overrides.scratch_dir {
            self.codec.scratch_dir = Some(dir.clone());
        }
        self
    }

    /// Check the merged configuration
    ///
    /// # Errors
    /// Returns `ConfigError::Budget` or `ConfigError::Filter`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.budget.validate()?;
        tracing_subscriber::EnvFilter::try_new(&self.logging.filter).map_err(|e| {
            ConfigError::Filter {
                filter: self.logging.filter.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(())
    }

    /// Load, merge and validate in one step
    ///
    /// # Errors
    /// Any `ConfigError` from the individual steps
    pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let config = Self::load(path)?.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Returns `ConfigError::Render` if serialization fails
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}
