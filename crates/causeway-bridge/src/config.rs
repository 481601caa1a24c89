//! Bridge configuration
//!
//! Small TOML-loadable knob set for the bridge. Defaults are safe for
//! embedding; `strict_faults` follows the build profile so development builds
//! stop at the violation site while production builds propagate a typed
//! internal error instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML syntax: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Maximum aggregate nesting depth the encoder accepts.
    pub max_encode_depth: usize,
    /// When set, internal invariant violations panic at the violation site
    /// instead of propagating as `Fault` errors.
    pub strict_faults: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            max_encode_depth: 64,
            strict_faults: cfg!(debug_assertions),
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_encode_depth == 0 {
            return Err(ConfigError::Validation(
                "max_encode_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// A permissive configuration for embedders that want typed faults even
    /// in development builds.
    pub fn lenient() -> Self {
        BridgeConfig {
            strict_faults: false,
            ..Default::default()
        }
    }
}
