//! Quarry state: a Redux-like container and the query-builder actions.
//!
//! [`StateContainer`] commits actions synchronously and defers effects to a
//! queue the owner drains. [`QueryBuilderState`] and [`QueryAction`] are the
//! surface a query builder UI dispatches against.

#![warn(clippy::all)]

pub mod actions;
pub mod container;
pub mod error;
pub mod fetch;

pub use actions::{QueryAction, QueryBuilderState};
pub use container::{Action, ChangeOrigin, Effect, EffectUpdater, StateContainer, Transition};
pub use error::{StateError, StateResult};
pub use fetch::{DataState, FetchData, QueryRunner};
