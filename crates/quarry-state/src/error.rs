//! Error types for the state container and query-builder actions

use quarry_core::{EditError, QueryId};
use thiserror::Error;

/// Errors raised while dispatching an action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The container was disposed
    #[error("state container has been disposed")]
    Disposed,

    /// The underlying structural edit failed
    #[error(transparent)]
    Edit(#[from] EditError),

    /// The action named a query that is not part of the current tree
    #[error("no query {0} in the current tree")]
    UnknownQuery(QueryId),

    /// Undo history is empty
    #[error("nothing to undo")]
    NothingToUndo,

    /// Redo history is empty
    #[error("nothing to redo")]
    NothingToRedo,
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
