//! Editing commands: apply one query-builder action and print the result

use anyhow::{bail, Result};
use quarry_config::QuarryConfig;
use quarry_core::QueryId;
use quarry_state::{ChangeOrigin, QueryAction, QueryBuilderState, StateContainer};
use tracing::debug;

use crate::cli::QueryArgs;
use crate::commands::render_query;
use crate::input;

/// Follow `path` from the end of the query
pub fn navigate(args: &QueryArgs, config: &QuarryConfig, path: Vec<String>) -> Result<String> {
    run(args, config, |at| QueryAction::AppendNavigate { at, path })
}

/// Show the column at a dotted path
pub fn select(args: &QueryArgs, config: &QuarryConfig, dotted: &str) -> Result<String> {
    let path: Vec<String> = dotted.split('.').map(str::to_string).collect();
    if path.iter().any(String::is_empty) {
        bail!("Invalid column path '{dotted}'");
    }
    run(args, config, |at| QueryAction::Select { at, path })
}

/// Group by `columns`
pub fn group(args: &QueryArgs, config: &QuarryConfig, columns: Vec<String>) -> Result<String> {
    run(args, config, |at| QueryAction::AppendGroup { at, by_path: columns })
}

/// Dispatch the action built by `action` against the root of the loaded query
fn run(
    args: &QueryArgs,
    config: &QuarryConfig,
    action: impl FnOnce(QueryId) -> QueryAction,
) -> Result<String> {
    let (domain, query) = input::load(args)?;
    let state = QueryBuilderState::new(domain, query, &config.editor);
    let root = state.query.id;

    let mut container = StateContainer::new(state, |state: &QueryBuilderState, origin: &ChangeOrigin| {
        debug!(?origin, revision = state.revision, "Query changed");
    });
    container.dispatch(action(root))?;
    container.run_effects();

    let result = render_query(&container.get_state().query, args.format);
    container.dispose();
    result
}
