//! Fluent structural editor.
//!
//! An [`Editor`] wraps a [`QueryLoc`] and consumes itself on every call,
//! returning an editor positioned on the rebased location in the new tree.
//! Structural calls normalise the tree (infer, reconcile, infer) before
//! rebasing; the `*_with` escape hatches leave the tree as the caller built it.

use std::sync::Arc;

use tracing::debug;

use crate::error::{EditError, EditResult};
use crate::infer::infer_type;
use crate::loc::{rebase_loc, Edge, QueryLoc};
use crate::model::{Domain, Query, QueryId};
use crate::op;
use crate::reconcile::{normalize, ReconcileOptions};

/// A location plus everything needed to keep the tree normalised
#[derive(Debug, Clone)]
pub struct Editor {
    loc: QueryLoc,
    domain: Arc<Domain>,
    options: ReconcileOptions,
}

impl Editor {
    /// Position an editor on `id` inside `root`.
    ///
    /// When `id` names a pipeline the editor moves to that pipeline's
    /// insertion point at `edge`. The domain is taken from the root's context.
    pub fn at(root: Query, id: QueryId, edge: Edge) -> EditResult<Self> {
        let target = root.find(id).ok_or(EditError::InvalidLocation(id))?;
        let domain = Arc::clone(&root.context.domain);
        let loc = QueryLoc::at_insertion_point(root.clone(), target, edge)?;
        Ok(Self::new(loc, domain))
    }

    /// Editor over an explicit location
    pub fn new(loc: QueryLoc, domain: Arc<Domain>) -> Self {
        Self {
            loc,
            domain,
            options: ReconcileOptions::default(),
        }
    }

    /// Use different reconciliation options
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Current location
    pub fn loc(&self) -> &QueryLoc {
        &self.loc
    }

    /// Move to another node of the same tree
    pub fn set_loc(self, id: QueryId) -> EditResult<Self> {
        if self.loc.root.find(id).is_none() {
            return Err(EditError::InvalidLocation(id));
        }
        Ok(Self {
            loc: QueryLoc::new(self.loc.root, id),
            ..self
        })
    }

    /// Insert `what` after the current node
    pub fn insert_after(self, what: Vec<Query>) -> EditResult<Self> {
        debug!(at = %self.loc.at, count = what.len(), "insert_after:begin");
        let root = op::insert_after(&self.loc, what)?;
        Ok(self.finish("insert_after", root))
    }

    /// Remove the current node; an emptied root becomes `pipeline(here)`
    pub fn remove(self) -> EditResult<Self> {
        debug!(at = %self.loc.at, "remove:begin");
        let root = op::remove(&self.loc)?.unwrap_or_else(empty_root);
        Ok(self.finish("remove", root))
    }

    /// Cut the enclosing pipeline before the current node
    pub fn cut(self) -> EditResult<Self> {
        debug!(at = %self.loc.at, "cut:begin");
        let root = op::cut(&self.loc)?.unwrap_or_else(empty_root);
        Ok(self.finish("cut", root))
    }

    /// Drop the enclosing pipeline's trailing select
    pub fn remove_select(self) -> EditResult<Self> {
        debug!(at = %self.loc.at, "remove_select:begin");
        let root = op::remove_select(&self.loc)?.unwrap_or_else(empty_root);
        Ok(self.finish("remove_select", root))
    }

    /// Grow nested selects along `path`, optionally appending `add` innermost
    pub fn grow_navigation(self, path: &[String], add: Option<Query>) -> EditResult<Self> {
        debug!(at = %self.loc.at, path = ?path, "grow_navigation:begin");
        let root = op::grow_navigation(&self.loc, path, add)?;
        Ok(self.finish("grow_navigation", root))
    }

    /// Replace the current node with `query` and move onto it
    pub fn replace_with(self, query: Query) -> EditResult<Self> {
        debug!(at = %self.loc.at, with = %query, "replace_with:begin");
        let id = query.id;
        let root = op::edit(&self.loc, |_| Some(query))?
            .ok_or_else(|| EditError::InvalidStructure("replacement removed the query".to_string()))?;
        Ok(self.rebase_onto(root, id))
    }

    /// Replace the current node with `f(node)` and move onto the result
    pub fn transform_with(self, f: impl FnOnce(&Query) -> Query) -> EditResult<Self> {
        debug!(at = %self.loc.at, "transform_with:begin");
        let mut replacement = None;
        let root = op::transform(&self.loc, |node| {
            let next = f(node);
            replacement = Some(next.id);
            Some(next)
        })?
        .ok_or_else(|| EditError::InvalidStructure("transform removed the query".to_string()))?;
        let id = replacement.unwrap_or(self.loc.at);
        Ok(self.rebase_onto(root, id))
    }

    /// Rewrite the steps of the enclosing pipeline with `f`
    pub fn transform_pipeline_with(self, f: impl FnOnce(Vec<Query>) -> Vec<Query>) -> EditResult<Self> {
        debug!(at = %self.loc.at, "transform_pipeline_with:begin");
        let root = op::edit_pipeline(&self.loc, |steps| Ok(f(steps)))?
            .ok_or_else(|| EditError::InvalidStructure("transform removed the pipeline".to_string()))?;
        let loc = rebase_loc(&self.loc, root);
        debug!(at = %loc.at, "transform_pipeline_with:end");
        Ok(Self { loc, ..self })
    }

    /// Re-run type inference over the whole tree
    pub fn infer_type(self) -> Self {
        let root = infer_type(&self.domain, &self.loc.root);
        let loc = rebase_loc(&self.loc, root);
        Self { loc, ..self }
    }

    /// The normalised root
    pub fn get_query(&self) -> Query {
        normalize(&self.domain, &self.loc.root, &self.options)
    }

    fn finish(self, operation: &str, root: Query) -> Self {
        let root = normalize(&self.domain, &root, &self.options);
        let loc = rebase_loc(&self.loc, root);
        debug!(at = %loc.at, root = %loc.root, "{operation}:end");
        Self { loc, ..self }
    }

    fn rebase_onto(self, root: Query, id: QueryId) -> Self {
        let loc = if root.find(id).is_some() {
            QueryLoc::new(root, id)
        } else {
            rebase_loc(&self.loc, root)
        };
        debug!(at = %loc.at, "rebased onto replacement");
        Self { loc, ..self }
    }
}

fn empty_root() -> Query {
    Query::pipeline(vec![Query::here()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, Fields, ScalarKind, Type};

    fn domain() -> Arc<Domain> {
        Domain::builder()
            .entity(
                "patient",
                "Patient",
                [
                    ("id", Attribute::new(Type::scalar(ScalarKind::Text))),
                    ("name", Attribute::new(Type::scalar(ScalarKind::Text))),
                    ("address", Attribute::new(Type::entity("address"))),
                ],
            )
            .entity(
                "address",
                "Address",
                [("city", Attribute::new(Type::scalar(ScalarKind::Text)))],
            )
            .build()
    }

    fn root(steps: Vec<Query>) -> Query {
        infer_type(&domain(), &Query::pipeline(steps))
    }

    #[test]
    fn test_at_pipeline_moves_to_insertion_point() {
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let root = root(vec![
            patient,
            Query::select([("id", Query::navigate("id"))].into_iter().collect()),
        ]);
        let editor = Editor::at(root.clone(), root.id, Edge::Trailing).unwrap();
        assert_eq!(editor.loc().at, patient_id);
    }

    #[test]
    fn test_remove_only_step_yields_here() {
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let editor = Editor::at(root(vec![patient]), patient_id, Edge::Trailing)
            .unwrap()
            .remove()
            .unwrap();
        assert_eq!(editor.get_query().to_string(), "pipeline(here)");
    }

    #[test]
    fn test_insert_after_normalises_and_keeps_location() {
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let editor = Editor::at(root(vec![patient]), patient_id, Edge::Trailing)
            .unwrap()
            .insert_after(vec![Query::navigate("address")])
            .unwrap();
        assert_eq!(editor.loc().at, patient_id);
        assert_eq!(
            editor.loc().root.to_string(),
            "pipeline(navigate(patient), navigate(address), select(city: pipeline(navigate(city))))"
        );
    }

    #[test]
    fn test_cut_everything_yields_here() {
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let editor = Editor::at(root(vec![patient]), patient_id, Edge::Trailing)
            .unwrap()
            .cut()
            .unwrap();
        assert_eq!(editor.loc().root.to_string(), "pipeline(here)");
        assert_eq!(editor.loc().at, editor.loc().root.steps().unwrap()[0].id);
    }

    #[test]
    fn test_grow_navigation() {
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let editor = Editor::at(root(vec![patient]), patient_id, Edge::Trailing)
            .unwrap()
            .grow_navigation(&["address".to_string(), "city".to_string()], None)
            .unwrap();
        assert_eq!(
            editor.get_query().to_string(),
            "pipeline(navigate(patient), select(address: pipeline(navigate(address), \
             select(city: pipeline(navigate(city))))))"
        );
    }

    #[test]
    fn test_replace_with_moves_onto_replacement() {
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let replacement = Query::navigate("address");
        let replacement_id = replacement.id;
        let editor = Editor::at(root(vec![patient]), patient_id, Edge::Trailing)
            .unwrap()
            .replace_with(replacement)
            .unwrap();
        assert_eq!(editor.loc().at, replacement_id);
        // escape hatches do not normalise
        assert_eq!(editor.loc().root.to_string(), "pipeline(navigate(address))");
    }

    #[test]
    fn test_transform_with_and_pipeline_with() {
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let editor = Editor::at(root(vec![patient]), patient_id, Edge::Trailing)
            .unwrap()
            .transform_with(|_| Query::navigate("address"))
            .unwrap();
        let moved = editor.loc().at;
        assert_ne!(moved, patient_id);

        let editor = editor
            .transform_pipeline_with(|mut steps| {
                steps.insert(0, Query::here());
                steps
            })
            .unwrap();
        assert_eq!(editor.loc().at, moved);
        assert_eq!(editor.loc().root.to_string(), "pipeline(here, navigate(address))");
    }

    #[test]
    fn test_remove_select_then_get_query_reseeds() {
        let patient = Query::navigate("patient");
        let patient_id = patient.id;
        let root = root(vec![
            patient,
            Query::select(
                [("name", Query::navigate("name"))]
                    .into_iter()
                    .collect::<Fields<_>>(),
            ),
        ]);
        let editor = Editor::at(root, patient_id, Edge::Trailing)
            .unwrap()
            .remove_select()
            .unwrap();
        let select = editor.loc().root.select_tail().unwrap().clone();
        assert_eq!(
            select.fields().unwrap().keys().collect::<Vec<_>>(),
            vec!["id", "name", "address"]
        );
    }

    #[test]
    fn test_stale_location_is_invalid() {
        let root = root(vec![Query::navigate("patient")]);
        let stale = QueryId::fresh();
        assert_eq!(
            Editor::at(root, stale, Edge::Trailing).unwrap_err(),
            EditError::InvalidLocation(stale)
        );
    }
}
