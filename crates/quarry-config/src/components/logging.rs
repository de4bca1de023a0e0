//! Logging component configuration

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for quarry crates (off, error, warn, info, debug, trace)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Check that `level` is a known level name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_ascii_lowercase();
        if LEVELS.contains(&level.as_str()) {
            Ok(())
        } else {
            Err(ConfigError::invalid(
                "logging.level",
                format!("unknown level '{}', expected one of {:?}", self.level, LEVELS),
            ))
        }
    }

    /// `EnvFilter` directive covering all quarry crates at the configured level.
    pub fn filter_directive(&self) -> String {
        let level = self.level.to_ascii_lowercase();
        ["quarry_core", "quarry_state", "quarry_config", "quarry_cli"]
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_covers_crates() {
        let config = LoggingConfig {
            level: "DEBUG".into(),
        };
        let directive = config.filter_directive();
        assert!(directive.contains("quarry_core=debug"));
        assert!(directive.contains("quarry_state=debug"));
    }

    #[test]
    fn test_unknown_level_rejected() {
        let config = LoggingConfig {
            level: "loud".into(),
        };
        assert!(config.validate().is_err());
    }
}
