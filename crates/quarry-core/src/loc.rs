//! Identity-addressed locations into a query tree.
//!
//! A [`QueryLoc`] pairs a root pipeline with the id of a node inside it. The
//! path from the root is recomputed on demand by a depth-first search, so
//! nodes never hold parent pointers. After an edit produces a new root, a
//! location is carried over with [`rebase_loc`].

use crate::error::{EditError, EditResult};
use crate::model::{Query, QueryId, QueryKind};

/// Which end of a pipeline to attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Edge {
    /// First step
    Leading,
    /// Last step, ignoring a trailing `select`
    #[default]
    Trailing,
}

/// How a node sits inside its container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Step `n` of a pipeline
    PipelineIndex(usize),
    /// Named field of a select
    SelectKey(String),
    /// The bound pipeline of a define
    Binding,
}

/// One segment of the path from the root to a node
#[derive(Debug, Clone)]
pub struct PathStep<'a> {
    /// The container node
    pub container: &'a Query,
    /// Where inside `container` the path continues
    pub slot: Slot,
}

/// A node of a root pipeline, addressed by id
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLoc {
    /// Root pipeline
    pub root: Query,
    /// Target node id
    pub at: QueryId,
}

impl QueryLoc {
    /// Create a location
    pub fn new(root: Query, at: QueryId) -> Self {
        Self { root, at }
    }

    /// Location of `query`'s insertion point when it is a pipeline, or of
    /// `query` itself otherwise
    pub fn at_insertion_point(root: Query, query: &Query, edge: Edge) -> EditResult<Self> {
        let at = if query.is_pipeline() {
            get_insertion_point(query, edge)?.id
        } else {
            query.id
        };
        Ok(Self { root, at })
    }

    /// The target node
    pub fn resolve(&self) -> EditResult<&Query> {
        self.resolve_with_path().map(|(node, _)| node)
    }

    /// The target node and the path leading to it
    pub fn resolve_with_path(&self) -> EditResult<(&Query, Vec<PathStep<'_>>)> {
        resolve_with_path(self)
    }
}

/// Find the node at `loc` and the containers traversed to reach it
pub fn resolve_with_path(loc: &QueryLoc) -> EditResult<(&Query, Vec<PathStep<'_>>)> {
    let mut path = Vec::new();
    match search(&loc.root, loc.at, &mut path) {
        Some(node) => Ok((node, path)),
        None => Err(EditError::InvalidLocation(loc.at)),
    }
}

fn search<'a>(node: &'a Query, id: QueryId, path: &mut Vec<PathStep<'a>>) -> Option<&'a Query> {
    if node.id == id {
        return Some(node);
    }
    match &node.kind {
        QueryKind::Pipeline { steps } => {
            for (index, step) in steps.iter().enumerate() {
                path.push(PathStep {
                    container: node,
                    slot: Slot::PipelineIndex(index),
                });
                if let Some(found) = search(step, id, path) {
                    return Some(found);
                }
                path.pop();
            }
            None
        }
        QueryKind::Select { fields } => {
            for (key, field) in fields.iter() {
                path.push(PathStep {
                    container: node,
                    slot: Slot::SelectKey(key.to_string()),
                });
                if let Some(found) = search(field, id, path) {
                    return Some(found);
                }
                path.pop();
            }
            None
        }
        QueryKind::Define { binding } => {
            path.push(PathStep {
                container: node,
                slot: Slot::Binding,
            });
            if let Some(found) = search(&binding.query, id, path) {
                return Some(found);
            }
            path.pop();
            None
        }
        _ => None,
    }
}

/// The step new steps attach to.
///
/// Trailing picks the last step, skipping a `select` tail; leading picks the
/// first step.
pub fn get_insertion_point(pipeline: &Query, edge: Edge) -> EditResult<&Query> {
    let steps = pipeline
        .steps()
        .ok_or_else(|| EditError::InvalidStructure(format!("expected a pipeline, got {}", pipeline.name())))?;
    match steps {
        [] => return Err(EditError::InvalidStructure("empty pipeline".to_string())),
        [only] if only.is_select() => {
            return Err(EditError::InvalidStructure("select-only pipeline".to_string()))
        }
        _ => {}
    }
    let last = steps.len() - 1;
    Ok(match edge {
        Edge::Leading => &steps[0],
        Edge::Trailing if steps[last].is_select() => &steps[last - 1],
        Edge::Trailing => &steps[last],
    })
}

/// Carry `old` over to `new_root`.
///
/// The id is kept when it survived the edit. Otherwise the location falls back,
/// in order, to the nearest preceding step of the enclosing pipeline, the
/// following non-select steps, the enclosing containers from innermost to
/// outermost, and finally the trailing insertion point of the new root.
pub fn rebase_loc(old: &QueryLoc, new_root: Query) -> QueryLoc {
    if new_root.find(old.at).is_some() {
        return QueryLoc::new(new_root, old.at);
    }
    let fallback = match resolve_with_path(old) {
        Ok((_, path)) => fallback_candidates(&path)
            .into_iter()
            .find_map(|id| new_root.find(id))
            .map(attach_point),
        Err(_) => None,
    };
    let at = fallback
        .or_else(|| get_insertion_point(&new_root, Edge::Trailing).ok().map(|q| q.id))
        .unwrap_or(new_root.id);
    QueryLoc::new(new_root, at)
}

fn fallback_candidates(path: &[PathStep<'_>]) -> Vec<QueryId> {
    let mut candidates = Vec::new();
    for step in path.iter().rev() {
        match (&step.slot, step.container.steps()) {
            (Slot::PipelineIndex(index), Some(steps)) => {
                candidates.extend(steps[..*index].iter().rev().map(|q| q.id));
                candidates.extend(
                    steps
                        .iter()
                        .skip(index + 1)
                        .filter(|q| !q.is_select())
                        .map(|q| q.id),
                );
                candidates.push(step.container.id);
            }
            (Slot::Binding, _) => candidates.push(step.container.id),
            // selects are not attach points; their enclosing pipeline is
            _ => {}
        }
    }
    candidates
}

fn attach_point(found: &Query) -> QueryId {
    if found.is_pipeline() {
        get_insertion_point(found, Edge::Trailing)
            .map(|q| q.id)
            .unwrap_or(found.id)
    } else {
        found.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fields;

    fn sample() -> (Query, QueryId, QueryId, QueryId) {
        let city = Query::navigate("city");
        let city_id = city.id;
        let address = Query::navigate("address");
        let address_id = address.id;
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let root = Query::pipeline(vec![
            patient,
            Query::select(
                [("address", Query::pipeline(vec![address, city]))]
                    .into_iter()
                    .collect::<Fields<_>>(),
            ),
        ]);
        (root, patient_id, address_id, city_id)
    }

    #[test]
    fn test_resolve_with_path() {
        let (root, _, _, city_id) = sample();
        let loc = QueryLoc::new(root, city_id);
        let (node, path) = loc.resolve_with_path().unwrap();
        assert_eq!(node.to_string(), "navigate(city)");
        let slots: Vec<_> = path.iter().map(|s| s.slot.clone()).collect();
        assert_eq!(
            slots,
            vec![
                Slot::PipelineIndex(1),
                Slot::SelectKey("address".to_string()),
                Slot::PipelineIndex(1),
            ]
        );
    }

    #[test]
    fn test_resolve_missing_id() {
        let (root, ..) = sample();
        let missing = QueryId::fresh();
        let err = QueryLoc::new(root, missing).resolve().unwrap_err();
        assert_eq!(err, EditError::InvalidLocation(missing));
    }

    #[test]
    fn test_insertion_point_skips_select_tail() {
        let (root, patient_id, ..) = sample();
        assert_eq!(get_insertion_point(&root, Edge::Trailing).unwrap().id, patient_id);
        assert_eq!(get_insertion_point(&root, Edge::Leading).unwrap().id, patient_id);

        let select_only = Query::pipeline(vec![Query::select(Fields::new())]);
        assert!(matches!(
            get_insertion_point(&select_only, Edge::Trailing),
            Err(EditError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_rebase_keeps_surviving_id() {
        let (root, patient_id, ..) = sample();
        let loc = QueryLoc::new(root.clone(), patient_id);
        let rebased = rebase_loc(&loc, root);
        assert_eq!(rebased.at, patient_id);
    }

    #[test]
    fn test_rebase_falls_back_to_preceding_step() {
        let (root, _, address_id, city_id) = sample();
        let address = root.find(address_id).unwrap().clone();
        // city dropped from the address pipeline
        let new_root = Query::pipeline(vec![
            Query::navigate("patient"),
            Query::select(
                [("address", Query::pipeline(vec![address]))]
                    .into_iter()
                    .collect::<Fields<_>>(),
            ),
        ]);
        let rebased = rebase_loc(&QueryLoc::new(root, city_id), new_root);
        assert_eq!(rebased.at, address_id);
    }

    #[test]
    fn test_rebase_falls_back_to_root_insertion_point() {
        let (root, _, _, city_id) = sample();
        let fresh = Query::navigate("visit");
        let fresh_id = fresh.id;
        let rebased = rebase_loc(&QueryLoc::new(root, city_id), Query::pipeline(vec![fresh]));
        assert_eq!(rebased.at, fresh_id);
    }
}
