//! Query-builder state and the actions a UI dispatches against it.
//!
//! Every action is a thin adapter over [`Editor`]: resolve the target node,
//! apply one structural edit, normalise, commit. Committed edits go on the
//! undo stack and, when a [`QueryRunner`] is attached, trigger a data fetch.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use quarry_config::EditorConfig;
use quarry_core::model::Expression;
use quarry_core::{
    normalize, Domain, Edge, EditError, Editor, Query, QueryId, QueryKind, QueryLoc,
    ReconcileOptions,
};
use tracing::debug;

use crate::container::{Action, Transition};
use crate::error::{StateError, StateResult};
use crate::fetch::{DataState, FetchData, QueryRunner};

// ============================================================================
// State
// ============================================================================

/// Everything a query builder UI renders from
#[derive(Clone)]
pub struct QueryBuilderState {
    /// Schema the query is typed against
    pub domain: Arc<Domain>,
    /// Current normalised root pipeline
    pub query: Query,
    /// Node the user is focused on
    pub active: Option<QueryId>,
    /// Bumped on every committed query change
    pub revision: u64,
    /// Result data for the query
    pub data: DataState,
    undo: VecDeque<Query>,
    redo: Vec<Query>,
    options: ReconcileOptions,
    undo_depth: usize,
    runner: Option<Arc<dyn QueryRunner>>,
}

impl fmt::Debug for QueryBuilderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilderState")
            .field("query", &self.query.to_string())
            .field("active", &self.active)
            .field("revision", &self.revision)
            .field("data", &self.data)
            .field("undo", &self.undo.len())
            .field("redo", &self.redo.len())
            .finish_non_exhaustive()
    }
}

impl QueryBuilderState {
    /// Start editing `query`, normalised against `domain`
    pub fn new(domain: Arc<Domain>, query: Query, config: &EditorConfig) -> Self {
        let options = ReconcileOptions::from(config);
        let query = normalize(&domain, &query.into_pipeline(), &options);
        Self {
            domain,
            query,
            active: None,
            revision: 0,
            data: DataState::Idle,
            undo: VecDeque::new(),
            redo: Vec::new(),
            options,
            undo_depth: config.undo_depth,
            runner: None,
        }
    }

    /// Fetch data through `runner` after every edit
    pub fn with_runner(mut self, runner: Arc<dyn QueryRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Whether `Undo` has anything to restore
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether `Redo` has anything to reapply
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undoable edits
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    fn node(&self, at: QueryId) -> StateResult<&Query> {
        self.query.find(at).ok_or(StateError::UnknownQuery(at))
    }

    /// Editor at the insertion point of `at`
    fn editor_at(&self, at: QueryId) -> StateResult<Editor> {
        self.node(at)?;
        Ok(Editor::at(self.query.clone(), at, Edge::Trailing)?.with_options(self.options.clone()))
    }

    /// Editor on `at` itself, even when it is a pipeline
    fn editor_on(&self, at: QueryId) -> StateResult<Editor> {
        self.node(at)?;
        let loc = QueryLoc::new(self.query.clone(), at);
        Ok(Editor::new(loc, Arc::clone(&self.domain)).with_options(self.options.clone()))
    }

    fn commit(&self, query: Query, active: Option<QueryId>) -> Transition<Self> {
        let mut next = self.clone();
        next.undo.push_back(self.query.clone());
        while next.undo.len() > next.undo_depth {
            next.undo.pop_front();
        }
        next.redo.clear();
        next.replace_query(query, active)
    }

    fn replace_query(mut self, query: Query, active: Option<QueryId>) -> Transition<Self> {
        self.active = active.filter(|id| query.find(*id).is_some());
        self.query = query;
        self.revision += 1;
        debug!(revision = self.revision, query = %self.query, "Committed query");
        match &self.runner {
            Some(runner) => {
                let fetch = FetchData::new(self.revision, self.query.clone(), Arc::clone(runner));
                Transition::WithEffects(self, vec![Box::new(fetch)])
            }
            None => Transition::Next(self),
        }
    }

    fn undo(&self) -> StateResult<Transition<Self>> {
        let mut next = self.clone();
        let previous = next.undo.pop_back().ok_or(StateError::NothingToUndo)?;
        next.redo.push(self.query.clone());
        Ok(next.replace_query(previous, self.active))
    }

    fn redo(&self) -> StateResult<Transition<Self>> {
        let mut next = self.clone();
        let following = next.redo.pop().ok_or(StateError::NothingToRedo)?;
        next.undo.push_back(self.query.clone());
        while next.undo.len() > next.undo_depth {
            next.undo.pop_front();
        }
        Ok(next.replace_query(following, self.active))
    }

    /// A binding name derived from `base` that is not already in scope at `at`
    fn fresh_binding_name(&self, at: QueryId, base: &str) -> StateResult<String> {
        let scope = &self.node(at)?.context.scope;
        if !scope.contains_key(base) {
            return Ok(base.to_string());
        }
        Ok((2..)
            .map(|n| format!("{base}_{n}"))
            .find(|name| !scope.contains_key(name))
            .unwrap_or_else(|| base.to_string()))
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Edits a query builder UI can request
#[derive(Debug, Clone, PartialEq)]
pub enum QueryAction {
    /// Replace the columns of the group step `at`
    SetGroupByPath { at: QueryId, by_path: Vec<String> },
    /// Bind `path` under a fresh name after `at`, optionally showing it
    AppendDefine {
        at: QueryId,
        path: Vec<String>,
        select: bool,
    },
    /// Insert a filter after `at`; defaults to an always-true predicate
    AppendFilter {
        at: QueryId,
        predicate: Option<Expression>,
    },
    /// Insert navigations along `path` after `at`
    AppendNavigate { at: QueryId, path: Vec<String> },
    /// Bind an aggregate of `path` after `at` and show it
    AppendDefineAndAggregate {
        at: QueryId,
        path: Vec<String>,
        aggregate: String,
    },
    /// Insert an aggregate of the input after `at`
    AppendAggregate { at: QueryId, aggregate: String },
    /// Insert a group step after `at`
    AppendGroup { at: QueryId, by_path: Vec<String> },
    /// Show `path` in the select of the pipeline around `at`
    Select { at: QueryId, path: Vec<String> },
    /// Hide `column` from the select of the pipeline around `at`
    SelectRemove { at: QueryId, column: String },
    /// Remove the node `at`
    Remove { at: QueryId },
    /// Drop everything from `at` on in its pipeline
    Cut { at: QueryId },
    /// Focus a node, or nothing
    SetActive { at: Option<QueryId> },
    /// Restore the query before the last edit
    Undo,
    /// Reapply the last undone edit
    Redo,
}

impl Action<QueryBuilderState> for QueryAction {
    fn name(&self) -> &'static str {
        match self {
            QueryAction::SetGroupByPath { .. } => "set_group_by_path",
            QueryAction::AppendDefine { .. } => "append_define",
            QueryAction::AppendFilter { .. } => "append_filter",
            QueryAction::AppendNavigate { .. } => "append_navigate",
            QueryAction::AppendDefineAndAggregate { .. } => "append_define_and_aggregate",
            QueryAction::AppendAggregate { .. } => "append_aggregate",
            QueryAction::AppendGroup { .. } => "append_group",
            QueryAction::Select { .. } => "select",
            QueryAction::SelectRemove { .. } => "select_remove",
            QueryAction::Remove { .. } => "remove",
            QueryAction::Cut { .. } => "cut",
            QueryAction::SetActive { .. } => "set_active",
            QueryAction::Undo => "undo",
            QueryAction::Redo => "redo",
        }
    }

    fn update(self, state: &QueryBuilderState) -> StateResult<Transition<QueryBuilderState>> {
        match self {
            QueryAction::SetActive { at } => {
                if let Some(id) = at {
                    state.node(id)?;
                }
                let mut next = state.clone();
                next.active = at;
                Ok(Transition::Next(next))
            }
            QueryAction::Undo => state.undo(),
            QueryAction::Redo => state.redo(),
            edit => {
                let (query, active) = edit.apply(state)?;
                Ok(state.commit(query, active))
            }
        }
    }
}

impl QueryAction {
    /// Run the edit, returning the new root and the node to focus
    fn apply(self, state: &QueryBuilderState) -> StateResult<(Query, Option<QueryId>)> {
        match self {
            QueryAction::SetGroupByPath { at, by_path } => {
                if !matches!(state.node(at)?.kind, QueryKind::Group { .. }) {
                    return Err(invalid(format!("{at} is not a group")));
                }
                let editor = state.editor_on(at)?.transform_with(|node| Query {
                    id: node.id,
                    context: node.context.clone(),
                    kind: QueryKind::Group { by_path },
                })?;
                Ok((editor.get_query(), Some(at)))
            }
            QueryAction::AppendDefine { at, path, select } => {
                let base = format!("{}_query", join_path(&path)?);
                let name = state.fresh_binding_name(at, &base)?;
                let define = Query::define(name.as_str(), navigations(&path));
                let define_id = define.id;
                let mut editor = state.editor_at(at)?.insert_after(vec![define])?;
                if select {
                    editor = editor.grow_navigation(&[name], None)?;
                }
                Ok((editor.loc().root.clone(), Some(define_id)))
            }
            QueryAction::AppendFilter { at, predicate } => {
                let filter = Query::filter(predicate.unwrap_or_else(|| Expression::value(true)));
                insert_one(state, at, filter)
            }
            QueryAction::AppendNavigate { at, path } => {
                join_path(&path)?;
                let steps: Vec<Query> = path.iter().map(Query::navigate).collect();
                let last = steps.last().map(|step| step.id);
                let editor = state.editor_at(at)?.insert_after(steps)?;
                Ok((editor.loc().root.clone(), last))
            }
            QueryAction::AppendDefineAndAggregate {
                at,
                path,
                aggregate,
            } => {
                let base = format!("{}_{aggregate}", join_path(&path)?);
                let name = state.fresh_binding_name(at, &base)?;
                let mut steps: Vec<Query> = path.iter().map(Query::navigate).collect();
                steps.push(Query::aggregate(aggregate));
                let define = Query::define(name.as_str(), Query::pipeline(steps));
                let define_id = define.id;
                let editor = state
                    .editor_at(at)?
                    .insert_after(vec![define])?
                    .grow_navigation(&[name], None)?;
                Ok((editor.loc().root.clone(), Some(define_id)))
            }
            QueryAction::AppendAggregate { at, aggregate } => {
                insert_one(state, at, Query::aggregate(aggregate))
            }
            QueryAction::AppendGroup { at, by_path } => insert_one(state, at, Query::group(by_path)),
            QueryAction::Select { at, path } => {
                join_path(&path)?;
                let editor = state.editor_at(at)?.grow_navigation(&path, None)?;
                Ok((editor.loc().root.clone(), Some(editor.loc().at)))
            }
            QueryAction::SelectRemove { at, column } => {
                let mut removed = false;
                let editor = state.editor_at(at)?.transform_pipeline_with(|steps| {
                    steps
                        .into_iter()
                        .filter_map(|step| {
                            let Query { id, context, kind } = step;
                            match kind {
                                QueryKind::Select { mut fields } => {
                                    removed |= fields.remove(&column).is_some();
                                    (!fields.is_empty()).then(|| Query {
                                        id,
                                        context,
                                        kind: QueryKind::Select { fields },
                                    })
                                }
                                kind => Some(Query { id, context, kind }),
                            }
                        })
                        .collect()
                })?;
                if !removed {
                    return Err(invalid(format!("no column {column} selected")));
                }
                Ok((editor.get_query(), Some(editor.loc().at)))
            }
            QueryAction::Remove { at } => {
                let editor = state.editor_on(at)?.remove()?;
                Ok((editor.loc().root.clone(), Some(editor.loc().at)))
            }
            QueryAction::Cut { at } => {
                let editor = state.editor_at(at)?.cut()?;
                Ok((editor.loc().root.clone(), Some(editor.loc().at)))
            }
            QueryAction::SetActive { .. } | QueryAction::Undo | QueryAction::Redo => {
                Err(invalid("not an edit".to_string()))
            }
        }
    }
}

fn insert_one(
    state: &QueryBuilderState,
    at: QueryId,
    query: Query,
) -> StateResult<(Query, Option<QueryId>)> {
    let id = query.id;
    let editor = state.editor_at(at)?.insert_after(vec![query])?;
    Ok((editor.loc().root.clone(), Some(id)))
}

fn navigations(path: &[String]) -> Query {
    Query::pipeline(path.iter().map(Query::navigate).collect())
}

fn join_path(path: &[String]) -> StateResult<String> {
    if path.is_empty() {
        return Err(invalid("empty path".to_string()));
    }
    Ok(path.join("_"))
}

fn invalid(message: String) -> StateError {
    StateError::Edit(EditError::InvalidOperation(message))
}
