//! Config file loading
//!
//! Resolution order for [`ConfigLoader::load_default`]:
//! 1. `$QUARRY_CONFIG` when set
//! 2. `<config dir>/quarry/config.toml` when it exists
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ConfigError, QuarryConfig};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "QUARRY_CONFIG";

/// Serialization format of a config document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (`.toml`)
    Toml,
    /// YAML (`.yaml`, `.yml`)
    Yaml,
    /// JSON (`.json`)
    Json,
}

impl ConfigFormat {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(format!(
                "'{}' (extension '{}')",
                path.display(),
                other
            ))),
        }
    }
}

/// Loads [`QuarryConfig`] documents
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a config file; the format follows the extension.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<QuarryConfig, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), ?format, "loading config");
        Self::load_from_str(&contents, format)
    }

    /// Parse and validate a config document.
    pub fn load_from_str(contents: &str, format: ConfigFormat) -> Result<QuarryConfig, ConfigError> {
        let config: QuarryConfig = match format {
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => toml::from_str(contents)?,
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
            ConfigFormat::Json => serde_json::from_str(contents)?,
            #[allow(unreachable_patterns)]
            other => {
                return Err(ConfigError::UnsupportedFormat(format!(
                    "{other:?} support is not enabled"
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `$QUARRY_CONFIG`, then the user config dir, else defaults.
    pub fn load_default() -> Result<QuarryConfig, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from_file(path),
            None => {
                debug!("no config file found, using defaults");
                Ok(QuarryConfig::default())
            }
        }
    }

    /// The config file [`ConfigLoader::load_default`] would read, if any.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(explicit));
        }
        dirs::config_dir()
            .map(|dir| dir.join("quarry").join("config.toml"))
            .filter(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/b.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("b.YML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(ConfigFormat::from_path(Path::new("b.ini")).is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConfigLoader::load_from_str(
            "[editor]\ncolumn_limit = 3\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.editor.column_limit, 3);
        assert_eq!(config.editor.undo_depth, 100);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_yaml_document() {
        let config = ConfigLoader::load_from_str(
            "editor:\n  column_priority: [code, label]\nlogging:\n  level: debug\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.editor.column_priority, vec!["code", "label"]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let result = ConfigLoader::load_from_str(
            r#"{"editor": {"column_limit": 0}}"#,
            ConfigFormat::Json,
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quarry.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[logging]\nlevel = \"info\"").unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ConfigLoader::load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
