//! Persisted query layout.
//!
//! Stored queries carry no ids or contexts. Loading mints fresh ids and
//! normalises the shape through the regular constructors, so empty pipelines
//! become `pipeline(here)` and bare select fields are wrapped.

use serde::{Deserialize, Serialize};

use super::expr::Expression;
use super::query::{Query, QueryKind};
use super::Fields;
use crate::error::DocumentError;

/// A query as persisted, tagged by `"name"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum StoredQuery {
    /// `{"name":"here"}`
    Here,
    /// `{"name":"navigate","path":"x"}`
    Navigate {
        /// Name to follow
        path: String,
    },
    /// `{"name":"select","select":{...}}`
    Select {
        /// Fields in display order
        select: Fields<StoredQuery>,
    },
    /// `{"name":"filter","predicate":{...}}`
    Filter {
        /// Predicate
        predicate: Expression,
    },
    /// `{"name":"aggregate","aggregate":"count","over":{...}}`
    Aggregate {
        /// Aggregate name
        aggregate: String,
        /// Operand; defaults to `pipeline(here)`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        over: Option<Box<StoredQuery>>,
    },
    /// `{"name":"group","byPath":["x"]}`
    Group {
        /// Grouping columns
        #[serde(rename = "byPath")]
        by_path: Vec<String>,
    },
    /// `{"name":"define","binding":{"name":"b","query":{...}}}`
    Define {
        /// The binding
        binding: StoredBinding,
    },
    /// `{"name":"pipeline","pipeline":[...]}`
    Pipeline {
        /// Steps
        pipeline: Vec<StoredQuery>,
    },
}

/// Persisted `define` binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBinding {
    /// Binding name
    pub name: String,
    /// Bound query
    pub query: Box<StoredQuery>,
}

impl StoredQuery {
    /// Build a live query with fresh ids
    pub fn into_query(self) -> Query {
        match self {
            StoredQuery::Here => Query::here(),
            StoredQuery::Navigate { path } => Query::navigate(path),
            StoredQuery::Select { select } => Query::select(select.map_values(|_, q| q.into_query())),
            StoredQuery::Filter { predicate } => Query::filter(predicate),
            StoredQuery::Aggregate { aggregate, over } => match over {
                Some(over) => Query::aggregate_over(aggregate, over.into_query()),
                None => Query::aggregate(aggregate),
            },
            StoredQuery::Group { by_path } => Query::group(by_path),
            StoredQuery::Define { binding } => Query::define(binding.name, binding.query.into_query()),
            StoredQuery::Pipeline { pipeline } => {
                Query::pipeline(pipeline.into_iter().map(StoredQuery::into_query).collect())
            }
        }
    }
}

impl From<&Query> for StoredQuery {
    fn from(query: &Query) -> Self {
        match &query.kind {
            QueryKind::Here => StoredQuery::Here,
            QueryKind::Navigate { path } => StoredQuery::Navigate { path: path.clone() },
            QueryKind::Select { fields } => StoredQuery::Select {
                select: fields.iter().map(|(k, v)| (k, StoredQuery::from(v))).collect(),
            },
            QueryKind::Filter { predicate } => StoredQuery::Filter {
                predicate: predicate.clone(),
            },
            QueryKind::Aggregate { aggregate, over } => StoredQuery::Aggregate {
                aggregate: aggregate.clone(),
                over: Some(Box::new(StoredQuery::from(over.as_ref()))),
            },
            QueryKind::Group { by_path } => StoredQuery::Group {
                by_path: by_path.clone(),
            },
            QueryKind::Define { binding } => StoredQuery::Define {
                binding: StoredBinding {
                    name: binding.name.clone(),
                    query: Box::new(StoredQuery::from(binding.query.as_ref())),
                },
            },
            QueryKind::Pipeline { steps } => StoredQuery::Pipeline {
                pipeline: steps.iter().map(StoredQuery::from).collect(),
            },
        }
    }
}

/// Parse a stored query document into a root pipeline with fresh ids.
///
/// A document holding nothing but a select starts from `here`.
pub fn load_query(json: &str) -> Result<Query, DocumentError> {
    let stored: StoredQuery = serde_json::from_str(json)?;
    let query = stored.into_query().into_pipeline();
    Ok(match query.steps() {
        Some([only]) if only.is_select() => Query::pipeline(vec![Query::here(), only.clone()]),
        _ => query,
    })
}

/// Serialise a query to its stored JSON document
pub fn save_query(query: &Query) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(&StoredQuery::from(query))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_normalises_shape() {
        let json = r#"{
            "name": "pipeline",
            "pipeline": [
                {"name": "navigate", "path": "patient"},
                {"name": "pipeline", "pipeline": []},
                {"name": "select", "select": {"id": {"name": "navigate", "path": "id"}}}
            ]
        }"#;
        let query = load_query(json).unwrap();
        assert_eq!(
            query.to_string(),
            "pipeline(navigate(patient), here, select(id: pipeline(navigate(id))))"
        );
    }

    #[test]
    fn test_load_wraps_root_atom() {
        let query = load_query(r#"{"name": "navigate", "path": "patient"}"#).unwrap();
        assert_eq!(query.to_string(), "pipeline(navigate(patient))");
    }

    #[test]
    fn test_load_select_only_document_starts_from_here() {
        let bare = load_query(r#"{"name": "select", "select": {"p": {"name": "navigate", "path": "patient"}}}"#)
            .unwrap();
        assert_eq!(bare.to_string(), "pipeline(here, select(p: pipeline(navigate(patient))))");

        let wrapped = load_query(
            r#"{"name": "pipeline", "pipeline": [{"name": "select", "select": {}}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.to_string(), "pipeline(here, select())");
    }

    #[test]
    fn test_load_mints_fresh_ids() {
        let json = r#"{"name": "pipeline", "pipeline": [{"name": "here"}]}"#;
        let a = load_query(json).unwrap();
        let b = load_query(json).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_save_then_load_preserves_structure() {
        let query = Query::pipeline(vec![
            Query::navigate("patient"),
            Query::group(["age"]),
            Query::define("v", Query::navigate("visit")),
            Query::aggregate("count"),
        ]);
        let json = save_query(&query).unwrap();
        assert!(json.contains("\"byPath\""));
        let loaded = load_query(&json).unwrap();
        assert_eq!(loaded.to_string(), query.to_string());
    }

    #[test]
    fn test_load_rejects_unknown_atom() {
        assert!(load_query(r#"{"name": "teleport"}"#).is_err());
    }
}
