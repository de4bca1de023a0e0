//! Command implementations. Each returns the text to print.

pub mod columns;
pub mod edit;
pub mod normalize;

use anyhow::Result;
use quarry_config::QuarryConfig;
use quarry_core::model::save_query;
use quarry_core::Query;

use crate::cli::{Commands, OutputFormat};

/// Run `command`, returning what to print
pub fn execute(command: Commands, config: &QuarryConfig) -> Result<String> {
    match command {
        Commands::Normalize { input } => normalize::execute(&input, config),
        Commands::Columns { input } => columns::execute(&input, config),
        Commands::Navigate { input, path } => edit::navigate(&input, config, path),
        Commands::Select { input, path } => edit::select(&input, config, &path),
        Commands::Group { input, columns } => edit::group(&input, config, columns),
    }
}

/// Render a query in the requested format
pub(crate) fn render_query(query: &Query, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(query.to_string()),
        OutputFormat::Json => Ok(save_query(query)?),
    }
}
