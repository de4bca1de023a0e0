//! Loading domains and stored queries from disk

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use quarry_core::model::{load_query, Domain};
use quarry_core::Query;
use tracing::debug;

use crate::cli::QueryArgs;

/// Read and parse a domain schema
pub fn load_domain(path: &Path) -> Result<Arc<Domain>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read domain file {}", path.display()))?;
    let domain = Domain::from_json(&contents)
        .with_context(|| format!("Invalid domain in {}", path.display()))?;
    debug!(entities = domain.entities.len(), path = %path.display(), "Loaded domain");
    Ok(Arc::new(domain))
}

/// Read a stored query, or start from `pipeline(here)` when there is none
pub fn load_stored_query(path: Option<&Path>) -> Result<Query> {
    let Some(path) = path else {
        return Ok(Query::pipeline(vec![Query::here()]));
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read query file {}", path.display()))?;
    load_query(&contents).with_context(|| format!("Invalid query in {}", path.display()))
}

/// Domain and query named by `args`
pub fn load(args: &QueryArgs) -> Result<(Arc<Domain>, Query)> {
    let domain = load_domain(&args.domain)?;
    let query = load_stored_query(args.query.as_deref())?;
    Ok((domain, query))
}
