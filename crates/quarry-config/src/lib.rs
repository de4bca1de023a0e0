//! # Quarry Configuration Library
//!
//! Type-safe configuration for the Quarry query builder: how reconciliation
//! seeds `select` columns, how much edit history the state container keeps,
//! and how verbose logging is.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry_config::ConfigLoader;
//!
//! let config = ConfigLoader::load_from_file("quarry.toml")?;
//! assert!(config.editor.column_limit >= 1);
//! # Ok::<(), quarry_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod components;
mod error;
mod loader;

pub use components::*;
pub use error::*;
pub use loader::*;

use serde::{Deserialize, Serialize};

/// Root configuration document.
///
/// Every section is optional in the file; missing sections take their
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    /// Query editor and reconciliation settings
    pub editor: EditorConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl QuarryConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.editor.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
