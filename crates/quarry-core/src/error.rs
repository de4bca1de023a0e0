//! Error types for structural editing and document loading.

use thiserror::Error;

use crate::model::QueryId;

/// Errors raised by locations and the structural editor.
///
/// These always indicate a caller or editor bug (a stale location, a broken
/// rebuild). Type-level problems are never reported here; they show up as
/// `invalid` types on the affected nodes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The location's id is not present in its tree
    #[error("Invalid location: no query with id {0}")]
    InvalidLocation(QueryId),

    /// A tree rebuild produced something other than a pipeline (or nothing)
    #[error("Invalid query structure: {0}")]
    InvalidStructure(String),

    /// The operation cannot be applied to this tree
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for editor operations
pub type EditResult<T> = Result<T, EditError>;

/// Errors raised while loading domains and stored queries.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Malformed JSON
    #[error("Failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed JSON that does not describe a valid document
    #[error("Invalid document: {0}")]
    Invalid(String),
}
