//! Query atoms and their composition into pipelines.

use std::fmt;

use super::context::{Binding, Context};
use super::expr::Expression;
use super::types::Type;
use super::{Fields, QueryId};

/// A query node: identity, inferred context and the atom itself.
///
/// Nodes are immutable values. Edits rebuild the path from the edited node to
/// the root and share everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Node identity
    pub id: QueryId,
    /// Inferred context; default until inference runs
    pub context: Context,
    /// The atom
    pub kind: QueryKind,
}

/// The closed set of query atoms
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    /// Identity step
    Here,
    /// Follow an attribute, entity or scope binding
    Navigate {
        /// Name to follow
        path: String,
    },
    /// Project named sub-pipelines
    Select {
        /// Field name to pipeline, in display order
        fields: Fields<Query>,
    },
    /// Keep elements satisfying a predicate
    Filter {
        /// Predicate evaluated per element
        predicate: Expression,
    },
    /// Apply a domain aggregate to the sequence produced by `over`
    Aggregate {
        /// Aggregate name
        aggregate: String,
        /// Operand pipeline, evaluated against the input
        over: Box<Query>,
    },
    /// Group a sequence of records by scalar attributes
    Group {
        /// Grouping columns
        by_path: Vec<String>,
    },
    /// Bring a named sub-pipeline into scope
    Define {
        /// The binding
        binding: Binding,
    },
    /// Sequential composition; never empty
    Pipeline {
        /// Steps, left to right
        steps: Vec<Query>,
    },
}

impl Query {
    fn new(kind: QueryKind) -> Self {
        Self {
            id: QueryId::fresh(),
            context: Context::default(),
            kind,
        }
    }

    /// Identity step
    pub fn here() -> Self {
        Self::new(QueryKind::Here)
    }

    /// Navigation step
    pub fn navigate(path: impl Into<String>) -> Self {
        Self::new(QueryKind::Navigate { path: path.into() })
    }

    /// Projection. Field values that are not pipelines are wrapped in one.
    pub fn select(fields: Fields<Query>) -> Self {
        let fields = fields.map_values(|_, query| query.into_pipeline());
        Self::new(QueryKind::Select { fields })
    }

    /// Filter step
    pub fn filter(predicate: Expression) -> Self {
        Self::new(QueryKind::Filter { predicate })
    }

    /// Aggregate over the input itself
    pub fn aggregate(aggregate: impl Into<String>) -> Self {
        Self::aggregate_over(aggregate, Query::pipeline(vec![Query::here()]))
    }

    /// Aggregate over the sequence produced by `over`
    pub fn aggregate_over(aggregate: impl Into<String>, over: Query) -> Self {
        Self::new(QueryKind::Aggregate {
            aggregate: aggregate.into(),
            over: Box::new(over.into_pipeline()),
        })
    }

    /// Grouping step
    pub fn group<I, S>(by_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(QueryKind::Group {
            by_path: by_path.into_iter().map(Into::into).collect(),
        })
    }

    /// Binding step
    pub fn define(name: impl Into<String>, query: Query) -> Self {
        Self::new(QueryKind::Define {
            binding: Binding::new(name, query.into_pipeline()),
        })
    }

    /// Pipeline. Nested pipelines are flattened and an empty step list
    /// becomes `pipeline(here)`.
    pub fn pipeline(steps: Vec<Query>) -> Self {
        Self::new(QueryKind::Pipeline {
            steps: flatten_steps(steps),
        })
    }

    /// Pipeline that keeps a given id
    pub(crate) fn pipeline_with_id(id: QueryId, context: Context, steps: Vec<Query>) -> Self {
        Self {
            id,
            context,
            kind: QueryKind::Pipeline { steps },
        }
    }

    /// Wrap in a pipeline unless already one
    pub fn into_pipeline(self) -> Self {
        if self.is_pipeline() {
            self
        } else {
            Query::pipeline(vec![self])
        }
    }

    /// Same node with a new id
    pub fn with_fresh_id(mut self) -> Self {
        self.id = QueryId::fresh();
        self
    }

    /// Atom name as used in the persisted form
    pub fn name(&self) -> &'static str {
        match self.kind {
            QueryKind::Here => "here",
            QueryKind::Navigate { .. } => "navigate",
            QueryKind::Select { .. } => "select",
            QueryKind::Filter { .. } => "filter",
            QueryKind::Aggregate { .. } => "aggregate",
            QueryKind::Group { .. } => "group",
            QueryKind::Define { .. } => "define",
            QueryKind::Pipeline { .. } => "pipeline",
        }
    }

    /// Inferred output type
    pub fn ty(&self) -> &Type {
        &self.context.ty
    }

    /// True for pipelines
    pub fn is_pipeline(&self) -> bool {
        matches!(self.kind, QueryKind::Pipeline { .. })
    }

    /// True for selects
    pub fn is_select(&self) -> bool {
        matches!(self.kind, QueryKind::Select { .. })
    }

    /// Steps of a pipeline
    pub fn steps(&self) -> Option<&[Query]> {
        match &self.kind {
            QueryKind::Pipeline { steps } => Some(steps),
            _ => None,
        }
    }

    /// Fields of a select
    pub fn fields(&self) -> Option<&Fields<Query>> {
        match &self.kind {
            QueryKind::Select { fields } => Some(fields),
            _ => None,
        }
    }

    /// Trailing `select` of a pipeline, if any
    pub fn select_tail(&self) -> Option<&Query> {
        self.steps()
            .and_then(|steps| steps.last())
            .filter(|last| last.is_select())
    }

    /// Find a node by id.
    ///
    /// Searches the same containers locations address: pipeline steps, select
    /// fields and define bindings.
    pub fn find(&self, id: QueryId) -> Option<&Query> {
        if self.id == id {
            return Some(self);
        }
        match &self.kind {
            QueryKind::Pipeline { steps } => steps.iter().find_map(|step| step.find(id)),
            QueryKind::Select { fields } => fields.values().find_map(|field| field.find(id)),
            QueryKind::Define { binding } => binding.query.find(id),
            _ => None,
        }
    }
}

fn flatten_steps(steps: Vec<Query>) -> Vec<Query> {
    let mut flat = Vec::with_capacity(steps.len());
    for step in steps {
        match step.kind {
            QueryKind::Pipeline { steps: inner } => flat.extend(flatten_steps(inner)),
            _ => flat.push(step),
        }
    }
    if flat.is_empty() {
        flat.push(Query::here());
    }
    flat
}

// ============================================================================
// Fold
// ============================================================================

/// Per-kind handlers over a query node.
///
/// Every handler defaults to [`QueryFold::otherwise`], so implementors only
/// spell out the kinds they care about.
pub trait QueryFold<'a> {
    /// Result of the fold
    type Output;

    /// Fallback for kinds without a dedicated handler
    fn otherwise(&mut self, query: &'a Query) -> Self::Output;

    /// `here`
    fn here(&mut self, query: &'a Query) -> Self::Output {
        self.otherwise(query)
    }

    /// `navigate`
    fn navigate(&mut self, query: &'a Query, _path: &'a str) -> Self::Output {
        self.otherwise(query)
    }

    /// `select`
    fn select(&mut self, query: &'a Query, _fields: &'a Fields<Query>) -> Self::Output {
        self.otherwise(query)
    }

    /// `filter`
    fn filter(&mut self, query: &'a Query, _predicate: &'a Expression) -> Self::Output {
        self.otherwise(query)
    }

    /// `aggregate`
    fn aggregate(&mut self, query: &'a Query, _aggregate: &'a str, _over: &'a Query) -> Self::Output {
        self.otherwise(query)
    }

    /// `group`
    fn group(&mut self, query: &'a Query, _by_path: &'a [String]) -> Self::Output {
        self.otherwise(query)
    }

    /// `define`
    fn define(&mut self, query: &'a Query, _binding: &'a Binding) -> Self::Output {
        self.otherwise(query)
    }

    /// `pipeline`
    fn pipeline(&mut self, query: &'a Query, _steps: &'a [Query]) -> Self::Output {
        self.otherwise(query)
    }
}

/// Dispatch `query` to the matching handler of `fold`
pub fn transform_query<'a, F: QueryFold<'a>>(query: &'a Query, fold: &mut F) -> F::Output {
    match &query.kind {
        QueryKind::Here => fold.here(query),
        QueryKind::Navigate { path } => fold.navigate(query, path),
        QueryKind::Select { fields } => fold.select(query, fields),
        QueryKind::Filter { predicate } => fold.filter(query, predicate),
        QueryKind::Aggregate { aggregate, over } => fold.aggregate(query, aggregate, over),
        QueryKind::Group { by_path } => fold.group(query, by_path),
        QueryKind::Define { binding } => fold.define(query, binding),
        QueryKind::Pipeline { steps } => fold.pipeline(query, steps),
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            QueryKind::Here => f.write_str("here"),
            QueryKind::Navigate { path } => write!(f, "navigate({path})"),
            QueryKind::Select { fields } => {
                f.write_str("select(")?;
                for (i, (name, query)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {query}")?;
                }
                f.write_str(")")
            }
            QueryKind::Filter { predicate } => write!(f, "filter({predicate})"),
            QueryKind::Aggregate { aggregate, over } => match over.steps() {
                Some([only]) if matches!(only.kind, QueryKind::Here) => {
                    write!(f, "aggregate({aggregate})")
                }
                _ => write!(f, "aggregate({aggregate}, {over})"),
            },
            QueryKind::Group { by_path } => write!(f, "group({})", by_path.join(", ")),
            QueryKind::Define { binding } => {
                write!(f, "define({} := {})", binding.name, binding.query)
            }
            QueryKind::Pipeline { steps } => {
                f.write_str("pipeline(")?;
                for (i, step) in steps.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{step}")?;
                }
                f.write_str(")")
            }
        }
    }
}
