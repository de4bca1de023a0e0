//! Type inference over query trees.
//!
//! Inference rebuilds a tree with every node's [`Context`] filled in. It never
//! fails: unresolvable references produce an `invalid` type on the offending
//! node while siblings and ancestors are still inferred.

use std::sync::Arc;

use tracing::trace;

use crate::model::{
    Attribute, Binding, CompareOp, Context, Domain, Expression, Fields, Literal, Query, QueryKind,
    ScalarKind, Type,
};

/// Infer a root query against `domain`
pub fn infer_type(domain: &Arc<Domain>, query: &Query) -> Query {
    infer_query_type(&Context::root(Arc::clone(domain)), query)
}

/// Infer `query` given the context flowing into it
pub fn infer_query_type(input: &Context, query: &Query) -> Query {
    infer_node(&Arc::new(input.clone()), query)
}

fn infer_node(input: &Arc<Context>, query: &Query) -> Query {
    let (kind, context) = match &query.kind {
        QueryKind::Here => (QueryKind::Here, pass_through(input)),
        QueryKind::Navigate { path } => (
            QueryKind::Navigate { path: path.clone() },
            infer_navigate(input, path),
        ),
        QueryKind::Select { fields } => infer_select(input, fields),
        QueryKind::Filter { predicate } => {
            let context = infer_filter(input, predicate);
            (
                QueryKind::Filter {
                    predicate: predicate.clone(),
                },
                context,
            )
        }
        QueryKind::Aggregate { aggregate, over } => infer_aggregate(input, aggregate, over),
        QueryKind::Group { by_path } => (
            QueryKind::Group {
                by_path: by_path.clone(),
            },
            infer_group(input, by_path),
        ),
        QueryKind::Define { binding } => infer_define(input, binding),
        QueryKind::Pipeline { steps } => infer_pipeline(input, steps),
    };
    Query {
        id: query.id,
        context,
        kind,
    }
}

fn output(input: &Arc<Context>, ty: Type, scope: Fields<Binding>, title: Option<String>) -> Context {
    Context {
        ty,
        scope,
        domain: Arc::clone(&input.domain),
        prev: Some(Arc::clone(input)),
        title,
    }
}

fn invalid(input: &Arc<Context>) -> Context {
    output(input, Type::invalid(), Fields::new(), None)
}

fn pass_through(input: &Arc<Context>) -> Context {
    output(input, input.ty.clone(), input.scope.clone(), input.title.clone())
}

/// Context seen by sub-queries evaluated once per input element
fn element_context(input: &Arc<Context>) -> Arc<Context> {
    Arc::new(input.with_type(input.ty.clone().one()))
}

fn infer_navigate(input: &Arc<Context>, path: &str) -> Context {
    let ty = &input.ty;
    if ty.is_void() {
        if let Some(binding) = input.scope.get(path) {
            return output(
                input,
                binding.query.ty().clone(),
                Fields::new(),
                Some(binding.query.context.title.clone().unwrap_or_else(|| path.to_string())),
            );
        }
        if let Some(entity) = input.domain.entity(path) {
            return output(
                input,
                Type::entity(path).seq(),
                Fields::new(),
                Some(entity.title.clone()),
            );
        }
    } else if let Some(record) = ty.as_record() {
        if let Some(binding) = input.scope.get(path) {
            let target = binding.query.ty();
            return output(
                input,
                target.clone().with_card(ty.card.compose(target.card)),
                Fields::new(),
                Some(binding.query.context.title.clone().unwrap_or_else(|| path.to_string())),
            );
        }
        if let Some(attribute) = input.domain.attributes_of(record).and_then(|a| a.get(path)) {
            return output(
                input,
                attribute.ty.clone().with_card(ty.card.compose(attribute.ty.card)),
                Fields::new(),
                Some(attribute.title.clone().unwrap_or_else(|| path.to_string())),
            );
        }
    }
    trace!(path, input = %input.ty, "navigation does not resolve");
    invalid(input)
}

fn infer_select(input: &Arc<Context>, fields: &Fields<Query>) -> (QueryKind, Context) {
    let element = element_context(input);
    let fields = fields
        .iter()
        .map(|(name, field)| (name, infer_node(&element, field)))
        .collect::<Fields<Query>>();

    let ty = &input.ty;
    let context = if ty.is_void() || ty.as_record().is_some() {
        let attributes = fields
            .iter()
            .map(|(name, field)| {
                (
                    name,
                    Attribute {
                        ty: field.ty().clone(),
                        title: field.context.title.clone(),
                        group_by: false,
                    },
                )
            })
            .collect();
        let entity = ty.as_record().and_then(|record| record.entity.clone());
        output(
            input,
            Type::record(entity, attributes).with_card(ty.card),
            Fields::new(),
            input.title.clone(),
        )
    } else {
        invalid(input)
    };
    (QueryKind::Select { fields }, context)
}

fn infer_filter(input: &Arc<Context>, predicate: &Expression) -> Context {
    let ty = &input.ty;
    if ty.as_record().is_none() && ty.as_scalar().is_none() {
        return invalid(input);
    }
    match expression_type(&input.domain, &ty.clone().one(), predicate) {
        Some(ExprType::Scalar(ScalarKind::Boolean)) => pass_through(input),
        _ => {
            trace!(%predicate, "filter predicate is not boolean");
            invalid(input)
        }
    }
}

fn infer_aggregate(input: &Arc<Context>, aggregate: &str, over: &Query) -> (QueryKind, Context) {
    let over = infer_node(input, over);
    let result = input
        .domain
        .aggregate(aggregate)
        .filter(|_| over.ty().is_seq() && !over.ty().is_invalid())
        .and_then(|descriptor| {
            descriptor
                .apply(over.ty())
                .map(|ty| (ty.one(), descriptor.title.clone()))
        });
    let context = match result {
        Some((ty, title)) => output(input, ty, Fields::new(), Some(title)),
        None => {
            trace!(aggregate, over = %over.ty(), "aggregate does not apply");
            invalid(input)
        }
    };
    (
        QueryKind::Aggregate {
            aggregate: aggregate.to_string(),
            over: Box::new(over),
        },
        context,
    )
}

fn infer_group(input: &Arc<Context>, by_path: &[String]) -> Context {
    if by_path.is_empty() {
        return pass_through(input);
    }
    let ty = &input.ty;
    let Some(record) = ty.as_record().filter(|_| ty.is_seq()) else {
        return invalid(input);
    };
    let Some(available) = input.domain.attributes_of(record) else {
        return invalid(input);
    };

    let mut attributes = Fields::new();
    for column in by_path {
        match available.get(column) {
            Some(attribute) if attribute.ty.as_scalar().is_some() && !attribute.ty.is_seq() => {
                attributes.insert(
                    column.as_str(),
                    Attribute {
                        ty: attribute.ty.clone(),
                        title: attribute.title.clone(),
                        group_by: true,
                    },
                );
            }
            _ => {
                trace!(column = %column, "column cannot be grouped by");
                return invalid(input);
            }
        }
    }
    let members = record.entity.clone().unwrap_or_else(|| "value".to_string());
    attributes.insert(
        members,
        Attribute {
            ty: ty.clone(),
            title: input.title.clone(),
            group_by: false,
        },
    );
    output(
        input,
        Type::record(None, attributes).seq(),
        Fields::new(),
        input.title.clone(),
    )
}

fn infer_define(input: &Arc<Context>, binding: &Binding) -> (QueryKind, Context) {
    let query = infer_node(&element_context(input), &binding.query);
    let binding = Binding {
        name: binding.name.clone(),
        query: Box::new(query),
    };
    let mut scope = input.scope.clone();
    scope.insert(binding.name.clone(), binding.clone());
    let context = output(input, input.ty.clone(), scope, input.title.clone());
    (QueryKind::Define { binding }, context)
}

fn infer_pipeline(input: &Arc<Context>, steps: &[Query]) -> (QueryKind, Context) {
    let mut current = Arc::clone(input);
    let mut inferred = Vec::with_capacity(steps.len());
    for step in steps {
        let step = infer_node(&current, step);
        current = Arc::new(step.context.clone());
        inferred.push(step);
    }
    let context = output(
        input,
        current.ty.clone(),
        current.scope.clone(),
        current.title.clone(),
    );
    (QueryKind::Pipeline { steps: inferred }, context)
}

// ============================================================================
// Predicate typing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExprType {
    Null,
    Scalar(ScalarKind),
}

fn expression_type(domain: &Domain, element: &Type, expr: &Expression) -> Option<ExprType> {
    match expr {
        Expression::Value { value } => Some(match value {
            Literal::Null => ExprType::Null,
            Literal::Bool(_) => ExprType::Scalar(ScalarKind::Boolean),
            Literal::Number(_) => ExprType::Scalar(ScalarKind::Number),
            Literal::Text(_) => ExprType::Scalar(ScalarKind::Text),
        }),
        Expression::Navigate { path } => {
            let attribute = domain.attributes_of(element.as_record()?)?.get(path)?;
            if attribute.ty.is_seq() {
                return None;
            }
            attribute.ty.as_scalar().map(ExprType::Scalar)
        }
        Expression::Compare { op, left, right } => {
            let left = expression_type(domain, element, left)?;
            let right = expression_type(domain, element, right)?;
            comparable(*op, left, right).then_some(ExprType::Scalar(ScalarKind::Boolean))
        }
        Expression::Logical { operands, .. } => {
            for operand in operands {
                if expression_type(domain, element, operand)?
                    != ExprType::Scalar(ScalarKind::Boolean)
                {
                    return None;
                }
            }
            Some(ExprType::Scalar(ScalarKind::Boolean))
        }
        Expression::Not { operand } => (expression_type(domain, element, operand)?
            == ExprType::Scalar(ScalarKind::Boolean))
            .then_some(ExprType::Scalar(ScalarKind::Boolean)),
    }
}

fn textual(kind: ScalarKind) -> bool {
    matches!(kind, ScalarKind::Text | ScalarKind::Enumeration)
}

/// Text literals stand in for enumeration labels and temporal values
fn compatible(a: ScalarKind, b: ScalarKind) -> bool {
    let temporal = |k| matches!(k, ScalarKind::Date | ScalarKind::Time | ScalarKind::DateTime);
    a == b
        || (a == ScalarKind::Text && (b == ScalarKind::Enumeration || temporal(b)))
        || (b == ScalarKind::Text && (a == ScalarKind::Enumeration || temporal(a)))
}

fn comparable(op: CompareOp, left: ExprType, right: ExprType) -> bool {
    match (left, right) {
        (ExprType::Null, _) | (_, ExprType::Null) => matches!(op, CompareOp::Eq | CompareOp::Ne),
        (ExprType::Scalar(a), ExprType::Scalar(b)) => match op {
            CompareOp::Eq | CompareOp::Ne => compatible(a, b),
            CompareOp::Contains => textual(a) && textual(b),
            _ => {
                compatible(a, b) && !matches!(a, ScalarKind::Boolean | ScalarKind::Json)
            }
        },
    }
}
