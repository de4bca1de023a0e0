//! Editor component configuration
//!
//! Controls how reconciliation seeds a fresh `select` and how much undo
//! history the query builder keeps.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default number of columns picked when a `select` is seeded from scratch.
pub const DEFAULT_COLUMN_LIMIT: usize = 5;

/// Default undo history depth.
pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// Attribute names preferred when seeding a `select`, in order.
pub const DEFAULT_COLUMN_PRIORITY: [&str; 5] = ["id", "key", "name", "title", "type"];

/// Editor component configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of non group-by columns in a seeded `select`
    pub column_limit: usize,
    /// Attribute names tried first when seeding a `select`
    pub column_priority: Vec<String>,
    /// Number of past queries kept for undo
    pub undo_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            column_limit: DEFAULT_COLUMN_LIMIT,
            column_priority: DEFAULT_COLUMN_PRIORITY
                .iter()
                .map(|s| s.to_string())
                .collect(),
            undo_depth: DEFAULT_UNDO_DEPTH,
        }
    }
}

impl EditorConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.column_limit == 0 {
            return Err(ConfigError::invalid(
                "editor.column_limit",
                "must be at least 1",
            ));
        }
        if let Some(blank) = self.column_priority.iter().find(|n| n.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "editor.column_priority",
                format!("contains a blank name ({blank:?})"),
            ));
        }
        Ok(())
    }
}
