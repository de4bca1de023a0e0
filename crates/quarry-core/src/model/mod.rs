//! Query tree model: atoms, contexts, types, domain and persisted form.

mod context;
mod domain;
mod expr;
mod fields;
mod id;
mod query;
mod stored;
mod types;

pub use context::{Binding, Context};
pub use domain::{
    AggregateDescriptor, AggregateInput, AggregateOutput, Domain, DomainBuilder, Entity,
};
pub use expr::{CompareOp, Expression, Literal, LogicalOp};
pub use fields::Fields;
pub use id::QueryId;
pub use query::{transform_query, Query, QueryFold, QueryKind};
pub use stored::{load_query, save_query, StoredBinding, StoredQuery};
pub use types::{Attribute, Cardinality, RecordType, ScalarKind, Type, TypeKind};
