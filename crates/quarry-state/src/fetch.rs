//! Fetching result data for the current query

use std::sync::Arc;

use quarry_core::Query;
use serde_json::Value;
use tracing::debug;

use crate::actions::QueryBuilderState;
use crate::container::{Effect, EffectUpdater};

/// Runs a query against a data source
pub trait QueryRunner {
    /// Result rows for `query`, or a message describing the failure
    fn run(&self, query: &Query) -> Result<Value, String>;
}

/// Result data for a given revision of the query
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DataState {
    /// Nothing requested yet
    #[default]
    Idle,
    /// A fetch for `revision` is pending
    Loading { revision: u64 },
    /// Data fetched for `revision`
    Ready { revision: u64, data: Value },
    /// The fetch for `revision` failed
    Failed { revision: u64, error: String },
}

impl DataState {
    /// Revision the data belongs to, if any
    pub fn revision(&self) -> Option<u64> {
        match self {
            DataState::Idle => None,
            DataState::Loading { revision }
            | DataState::Ready { revision, .. }
            | DataState::Failed { revision, .. } => Some(*revision),
        }
    }
}

/// Fetch data for one revision of the query
pub struct FetchData {
    revision: u64,
    query: Query,
    runner: Arc<dyn QueryRunner>,
}

impl FetchData {
    /// Fetch `query` for the state at `revision`
    pub fn new(revision: u64, query: Query, runner: Arc<dyn QueryRunner>) -> Self {
        Self {
            revision,
            query,
            runner,
        }
    }
}

impl Effect<QueryBuilderState> for FetchData {
    fn name(&self) -> &'static str {
        "fetch-data"
    }

    fn prepare(&self, mut state: QueryBuilderState) -> QueryBuilderState {
        state.data = DataState::Loading {
            revision: self.revision,
        };
        state
    }

    fn perform(self: Box<Self>, _state: &QueryBuilderState, updater: &EffectUpdater<QueryBuilderState>) {
        let revision = self.revision;
        let result = self.runner.run(&self.query);
        updater.set_state("fetch-finish", move |state| {
            if state.revision != revision {
                debug!(fetched = revision, current = state.revision, "Discarding stale fetch");
                return state.clone();
            }
            let mut next = state.clone();
            next.data = match result {
                Ok(data) => DataState::Ready { revision, data },
                Err(error) => DataState::Failed { revision, error },
            };
            next
        });
    }
}
