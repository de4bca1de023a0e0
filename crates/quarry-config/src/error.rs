//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the config file failed
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[cfg(feature = "toml")]
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parse error
    #[cfg(feature = "yaml")]
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension does not map to a supported (or enabled) format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A value parsed but failed validation
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted field name, e.g. `editor.column_limit`
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
