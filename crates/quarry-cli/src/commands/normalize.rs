use anyhow::Result;
use quarry_config::QuarryConfig;
use quarry_core::{normalize, ReconcileOptions};

use crate::cli::QueryArgs;
use crate::commands::render_query;
use crate::input;

/// The loaded query after inference and select reconciliation
pub fn execute(args: &QueryArgs, config: &QuarryConfig) -> Result<String> {
    let (domain, query) = input::load(args)?;
    let options = ReconcileOptions::from(&config.editor);
    let query = normalize(&domain, &query, &options);
    render_query(&query, args.format)
}
