//! Raw structural operations.
//!
//! Each operation takes a location and returns the new root, or `None` when
//! the edit deleted the root pipeline entirely. Nothing here runs inference
//! or reconciliation; see [`crate::editor::Editor`] for that.

use crate::error::{EditError, EditResult};
use crate::loc::{PathStep, QueryLoc, Slot};
use crate::model::{Binding, Query, QueryKind};

/// Rebuild the tree bottom-up along `path`, substituting `query` (or a
/// deletion when `None`) at the path's end.
///
/// Deleting the last step of a pipeline or the last field of a select deletes
/// the container too, and a pipeline left holding only a `select` counts as
/// empty. The result is either nothing or a pipeline.
pub fn transform_query_by_path(query: Option<Query>, path: &[PathStep<'_>]) -> EditResult<Option<Query>> {
    let mut current = query;
    for step in path.iter().rev() {
        let container = step.container;
        current = match (&container.kind, &step.slot) {
            (QueryKind::Pipeline { steps }, Slot::PipelineIndex(index)) => {
                let mut steps = steps.clone();
                if *index >= steps.len() {
                    return Err(EditError::InvalidStructure(format!(
                        "pipeline index {index} out of bounds"
                    )));
                }
                match current.take() {
                    None => {
                        steps.remove(*index);
                    }
                    Some(query) if query.is_pipeline() => {
                        return Err(EditError::InvalidStructure(
                            "a pipeline step cannot be a pipeline".to_string(),
                        ))
                    }
                    Some(query) => steps[*index] = query,
                }
                if steps.is_empty() || (steps.len() == 1 && steps[0].is_select()) {
                    None
                } else {
                    Some(Query::pipeline_with_id(container.id, container.context.clone(), steps))
                }
            }
            (QueryKind::Select { fields }, Slot::SelectKey(key)) => {
                let mut fields = fields.clone();
                match current.take() {
                    None => {
                        fields.remove(key);
                    }
                    Some(query) if !query.is_pipeline() => {
                        return Err(EditError::InvalidStructure(format!(
                            "select field '{key}' must be a pipeline, got {}",
                            query.name()
                        )))
                    }
                    Some(query) => {
                        fields.insert(key.as_str(), query);
                    }
                }
                if fields.is_empty() {
                    None
                } else {
                    Some(Query {
                        id: container.id,
                        context: container.context.clone(),
                        kind: QueryKind::Select { fields },
                    })
                }
            }
            (QueryKind::Define { binding }, Slot::Binding) => match current.take() {
                None => None,
                Some(query) if !query.is_pipeline() => {
                    return Err(EditError::InvalidStructure(format!(
                        "binding '{}' must be a pipeline, got {}",
                        binding.name,
                        query.name()
                    )))
                }
                Some(query) => Some(Query {
                    id: container.id,
                    context: container.context.clone(),
                    kind: QueryKind::Define {
                        binding: Binding {
                            name: binding.name.clone(),
                            query: Box::new(query),
                        },
                    },
                }),
            },
            (_, slot) => {
                return Err(EditError::InvalidStructure(format!(
                    "{slot:?} does not address into {}",
                    container.name()
                )))
            }
        };
    }
    match current {
        Some(query) if !query.is_pipeline() => Err(EditError::InvalidStructure(format!(
            "expected a pipeline (or nothing) but got {}",
            query.name()
        ))),
        result => Ok(result),
    }
}

/// Replace the node at `loc` with whatever `f` returns; `None` deletes it
pub fn edit(loc: &QueryLoc, f: impl FnOnce(&Query) -> Option<Query>) -> EditResult<Option<Query>> {
    let (node, path) = loc.resolve_with_path()?;
    transform_query_by_path(f(node), &path)
}

/// Rewrite the steps of the pipeline at `loc`, or of the pipeline enclosing
/// `loc` when it is a step. An empty or select-only result deletes the
/// pipeline.
pub fn edit_pipeline(
    loc: &QueryLoc,
    f: impl FnOnce(Vec<Query>) -> EditResult<Vec<Query>>,
) -> EditResult<Option<Query>> {
    let (node, mut path) = loc.resolve_with_path()?;
    let pipeline = if node.is_pipeline() {
        node
    } else {
        match path.pop() {
            Some(PathStep {
                container,
                slot: Slot::PipelineIndex(_),
            }) => container,
            _ => {
                return Err(EditError::InvalidStructure(format!(
                    "{} is not a pipeline step",
                    node.name()
                )))
            }
        }
    };
    let steps = f(pipeline.steps().map(<[Query]>::to_vec).unwrap_or_default())?;
    if steps.is_empty() || (steps.len() == 1 && steps[0].is_select()) {
        transform_query_by_path(None, &path)
    } else {
        let rebuilt = Query::pipeline_with_id(pipeline.id, pipeline.context.clone(), steps);
        transform_query_by_path(Some(rebuilt), &path)
    }
}

/// Drop the node at `loc` from its pipeline. At a pipeline node, drop the
/// whole pipeline from its container.
pub fn remove(loc: &QueryLoc) -> EditResult<Option<Query>> {
    let (node, path) = loc.resolve_with_path()?;
    if node.is_pipeline() {
        return transform_query_by_path(None, &path);
    }
    let at = loc.at;
    edit_pipeline(loc, |steps| {
        Ok(steps.into_iter().filter(|step| step.id != at).collect())
    })
}

/// Truncate the enclosing pipeline to the steps strictly before `loc`
pub fn cut(loc: &QueryLoc) -> EditResult<Option<Query>> {
    let at = loc.at;
    edit_pipeline(loc, |mut steps| {
        let index = steps
            .iter()
            .position(|step| step.id == at)
            .ok_or(EditError::InvalidLocation(at))?;
        steps.truncate(index);
        Ok(steps)
    })
}

/// Splice `what` into the enclosing pipeline right after `loc`.
/// Pipelines in `what` contribute their steps.
pub fn insert_after(loc: &QueryLoc, what: Vec<Query>) -> EditResult<Query> {
    let at = loc.at;
    let result = edit_pipeline(loc, |mut steps| {
        let index = steps
            .iter()
            .position(|step| step.id == at)
            .ok_or(EditError::InvalidLocation(at))?;
        let tail = steps.split_off(index + 1);
        steps.extend(what.into_iter().flat_map(into_steps));
        steps.extend(tail);
        Ok(steps)
    })?;
    result.ok_or_else(|| EditError::InvalidOperation("insert_after deleted the query".to_string()))
}

/// Replace the node at `loc` with `f(node)`
pub fn transform(loc: &QueryLoc, f: impl FnOnce(&Query) -> Option<Query>) -> EditResult<Option<Query>> {
    edit(loc, f)
}

/// Grow nested selects along `path` in the pipeline enclosing `loc`,
/// appending `add` to the innermost pipeline
pub fn grow_navigation(loc: &QueryLoc, path: &[String], add: Option<Query>) -> EditResult<Query> {
    let result = edit_pipeline(loc, |steps| Ok(grow_navigation_impl(steps, path, add)))?;
    result.ok_or_else(|| {
        EditError::InvalidOperation("grow_navigation deleted the query".to_string())
    })
}

/// Drop a trailing `select` from the enclosing pipeline
pub fn remove_select(loc: &QueryLoc) -> EditResult<Option<Query>> {
    edit_pipeline(loc, |mut steps| {
        if steps.last().is_some_and(Query::is_select) {
            steps.pop();
        }
        Ok(steps)
    })
}

fn into_steps(query: Query) -> Vec<Query> {
    match query.kind {
        QueryKind::Pipeline { steps } => steps,
        kind => vec![Query {
            id: query.id,
            context: query.context,
            kind,
        }],
    }
}

fn grow_navigation_impl(mut steps: Vec<Query>, path: &[String], add: Option<Query>) -> Vec<Query> {
    let Some((key, rest)) = path.split_first() else {
        if let Some(add) = add {
            steps.extend(into_steps(add));
        }
        return steps;
    };

    let tail = match steps.last() {
        Some(last) if last.is_select() => steps.pop(),
        _ => None,
    };
    let (id, context, mut fields) = match tail {
        Some(Query {
            id,
            context,
            kind: QueryKind::Select { fields },
        }) => (Some(id), context, fields),
        _ => (None, Default::default(), Default::default()),
    };

    let field = match fields.get(key) {
        Some(existing) => {
            let inner = existing.steps().map(<[Query]>::to_vec).unwrap_or_default();
            Query::pipeline_with_id(
                existing.id,
                existing.context.clone(),
                grow_navigation_impl(inner, rest, add),
            )
        }
        None => Query::pipeline(grow_navigation_impl(vec![Query::navigate(key.as_str())], rest, add)),
    };
    fields.insert(key.as_str(), field);

    let select = match id {
        Some(id) => Query {
            id,
            context,
            kind: QueryKind::Select { fields },
        },
        None => Query::select(fields),
    };
    steps.push(select);
    steps
}
