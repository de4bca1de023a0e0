//! Per-node inference context.

use std::sync::Arc;

use super::domain::Domain;
use super::types::Type;
use super::{Fields, Query};

/// A named sub-pipeline introduced by `define`
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Name the binding is visible under
    pub name: String,
    /// The bound pipeline
    pub query: Box<Query>,
}

impl Binding {
    /// Create a binding
    pub fn new(name: impl Into<String>, query: Query) -> Self {
        Self {
            name: name.into(),
            query: Box::new(query),
        }
    }
}

/// What inference knows about a node.
///
/// `prev` is the context the node received as input, so contexts form a chain
/// that mirrors the data flow of the enclosing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Output type of the node
    pub ty: Type,
    /// Bindings visible to the node's successors
    pub scope: Fields<Binding>,
    /// Schema the query is typed against
    pub domain: Arc<Domain>,
    /// Input context
    pub prev: Option<Arc<Context>>,
    /// Display title of the node's output
    pub title: Option<String>,
}

impl Default for Context {
    fn default() -> Self {
        Self::root(Domain::empty())
    }
}

impl Context {
    /// The context flowing into a root query
    pub fn root(domain: Arc<Domain>) -> Self {
        Self {
            ty: Type::void(),
            scope: Fields::new(),
            domain,
            prev: None,
            title: None,
        }
    }

    /// Input context, or a root context over the same domain when there is none
    pub fn input(&self) -> Context {
        match &self.prev {
            Some(prev) => prev.as_ref().clone(),
            None => Context::root(Arc::clone(&self.domain)),
        }
    }

    /// Same context with a different type
    pub fn with_type(&self, ty: Type) -> Context {
        Context {
            ty,
            ..self.clone()
        }
    }
}
