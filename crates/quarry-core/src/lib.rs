//! Quarry core: a structural query-editing engine.
//!
//! Queries are immutable trees of atoms composed into pipelines. Every node
//! carries an identity and an inferred context. This crate provides:
//!
//! - [`model`]: atoms, types, the domain schema and the persisted form
//! - [`loc`]: identity-addressed locations and rebasing
//! - [`op`] and [`editor`]: structural edits rebuilt bottom-up along a path
//! - [`infer`] and [`reconcile`]: type inference and select reconciliation
//! - [`navigation`]: what a column picker or group menu can offer
//!
//! ## Example
//!
//! ```
//! use quarry_core::prelude::*;
//!
//! let domain = Domain::builder()
//!     .entity(
//!         "patient",
//!         "Patient",
//!         [("id", Attribute::new(Type::scalar(ScalarKind::Text)))],
//!     )
//!     .build();
//! let root = infer_type(&domain, &Query::pipeline(vec![Query::here()]));
//! let here = root.steps().unwrap()[0].id;
//!
//! let query = Editor::at(root, here, Edge::Trailing)?
//!     .insert_after(vec![Query::navigate("patient")])?
//!     .get_query();
//! assert_eq!(
//!     query.to_string(),
//!     "pipeline(here, navigate(patient), select(id: pipeline(navigate(id))))"
//! );
//! # Ok::<(), quarry_core::EditError>(())
//! ```

#![warn(clippy::all)]

pub mod editor;
pub mod error;
pub mod infer;
pub mod loc;
pub mod model;
pub mod navigation;
pub mod op;
pub mod reconcile;

pub use editor::Editor;
pub use error::{DocumentError, EditError, EditResult};
pub use infer::{infer_query_type, infer_type};
pub use loc::{get_insertion_point, rebase_loc, resolve_with_path, Edge, PathStep, QueryLoc, Slot};
pub use model::{Domain, Query, QueryId, QueryKind, Type};
pub use navigation::{
    active_navigation, group_by_options, navigation_options, GroupOption, Navigation,
    NavigationKind,
};
pub use reconcile::{normalize, reconcile_navigation, ReconcileOptions};

/// Commonly used items
pub mod prelude {
    pub use crate::editor::Editor;
    pub use crate::error::{EditError, EditResult};
    pub use crate::infer::{infer_query_type, infer_type};
    pub use crate::loc::{Edge, QueryLoc};
    pub use crate::model::{
        Attribute, Cardinality, CompareOp, Context, Domain, Expression, Fields, Query, QueryId,
        QueryKind, ScalarKind, Type,
    };
    pub use crate::reconcile::{normalize, ReconcileOptions};
}
