use anyhow::Result;
use quarry_config::QuarryConfig;
use quarry_core::model::Cardinality;
use quarry_core::{
    active_navigation, get_insertion_point, navigation_options, normalize, Edge, NavigationKind,
    ReconcileOptions,
};
use serde_json::json;

use crate::cli::{OutputFormat, QueryArgs};
use crate::input;

/// Navigation options at the trailing insertion point of the query
pub fn execute(args: &QueryArgs, config: &QuarryConfig) -> Result<String> {
    let (domain, query) = input::load(args)?;
    let query = normalize(&domain, &query, &ReconcileOptions::from(&config.editor));
    let at = get_insertion_point(&query, Edge::Trailing)?;
    let options = navigation_options(at);
    let shown = active_navigation(&query);

    match args.format {
        OutputFormat::Json => {
            let rows: Vec<_> = options
                .iter()
                .map(|option| {
                    json!({
                        "navigation": option,
                        "selected": shown.contains_key(&option.value),
                    })
                })
                .collect();
            Ok(serde_json::to_string_pretty(&rows)?)
        }
        OutputFormat::Text => {
            let lines: Vec<String> = options
                .iter()
                .map(|option| {
                    let marker = if shown.contains_key(&option.value) { "*" } else { " " };
                    let kind = match option.kind {
                        NavigationKind::Record => "record",
                        NavigationKind::Attribute => "attribute",
                    };
                    format!(
                        "{marker} {:<20} {:<24} {kind}{}",
                        option.value,
                        option.label,
                        if option.card == Cardinality::Seq { " (seq)" } else { "" }
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}
