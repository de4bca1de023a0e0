//! Select reconciliation.
//!
//! Every pipeline whose result is a record ends in a non-empty `select` after
//! reconciliation, so there is always something to show for whatever the
//! query currently navigates to.

use std::sync::Arc;

use quarry_config::EditorConfig;
use tracing::trace;

use crate::infer::{infer_query_type, infer_type};
use crate::model::{Binding, Context, Domain, Fields, Query, QueryKind};

/// Column seeding parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Maximum number of seeded columns, not counting group-by columns
    pub column_limit: usize,
    /// Attribute names seeded first, in order
    pub column_priority: Vec<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for ReconcileOptions {
    fn from(config: &EditorConfig) -> Self {
        Self {
            column_limit: config.column_limit,
            column_priority: config.column_priority.clone(),
        }
    }
}

/// Infer, reconcile, then infer again so added or pruned fields are typed
pub fn normalize(domain: &Arc<Domain>, query: &Query, options: &ReconcileOptions) -> Query {
    let query = infer_type(domain, query);
    let query = reconcile_navigation(&query, options);
    infer_type(domain, &query)
}

/// Make sure every record-typed pipeline ends in a non-empty select.
///
/// Expects an inferred pipeline. Recurses through `define` bindings; select
/// fields are left to the user.
pub fn reconcile_navigation(query: &Query, options: &ReconcileOptions) -> Query {
    match query.steps() {
        Some(steps) => reconcile_pipeline(query, steps, options),
        None => query.clone(),
    }
}

fn reconcile_pipeline(query: &Query, steps: &[Query], options: &ReconcileOptions) -> Query {
    let Some(tail) = steps.last() else {
        return Query::pipeline_with_id(query.id, query.context.clone(), vec![Query::here()]);
    };

    let mut rebuilt: Vec<Query> = steps
        .iter()
        .filter(|step| !step.is_select() || step.id != tail.id)
        .map(|step| match &step.kind {
            QueryKind::Define { binding } => reconcile_define(step, binding, options),
            _ => step.clone(),
        })
        .collect();

    let select = if tail.is_select() {
        reconcile_select(&tail.context.input(), Some(tail), options)
    } else {
        reconcile_select(&tail.context, None, options)
    };
    if rebuilt.iter().all(Query::is_select) {
        trace!("pipeline has no steps before its select, starting from here");
        rebuilt.insert(0, Query::here());
    }
    rebuilt.extend(select);
    Query::pipeline_with_id(query.id, query.context.clone(), rebuilt)
}

fn reconcile_define(step: &Query, binding: &Binding, options: &ReconcileOptions) -> Query {
    Query {
        id: step.id,
        context: step.context.clone(),
        kind: QueryKind::Define {
            binding: Binding {
                name: binding.name.clone(),
                query: Box::new(reconcile_navigation(&binding.query, options)),
            },
        },
    }
}

/// Reconcile a select given the context flowing into it. `None` means the
/// pipeline should carry no select.
fn reconcile_select(
    context: &Context,
    existing: Option<&Query>,
    options: &ReconcileOptions,
) -> Option<Query> {
    if context.ty.is_invalid() {
        return existing
            .filter(|select| select.fields().is_some_and(|fields| !fields.is_empty()))
            .cloned();
    }

    let group_by = group_by_columns(context);
    let fields = match existing.and_then(Query::fields) {
        Some(fields) => {
            let kept: Fields<Query> = fields
                .iter()
                .filter(|(_, field)| !field.ty().is_invalid())
                .map(|(name, field)| (name, field.clone()))
                .collect();
            if kept.is_empty() {
                trace!("all select fields invalid, seeding from scratch");
                return reconcile_select(context, None, options);
            }
            let mut fields: Fields<Query> = group_by
                .iter()
                .filter(|column| !kept.contains_key(column))
                .map(|column| (column.as_str(), column_query(column)))
                .collect();
            for (name, field) in kept {
                fields.insert(name, field);
            }
            fields
        }
        None => {
            let mut fields: Fields<Query> = group_by
                .iter()
                .map(|column| (column.as_str(), column_query(column)))
                .collect();
            for column in seed_columns(context, options) {
                let query = column_query(&column);
                fields.insert(column, query);
            }
            fields
        }
    };

    if fields.is_empty() {
        return None;
    }
    trace!(columns = ?fields.keys().collect::<Vec<_>>(), "reconciled select");
    let select = match existing {
        Some(existing) => Query {
            id: existing.id,
            context: existing.context.clone(),
            kind: QueryKind::Select { fields },
        },
        None => Query::select(fields),
    };
    Some(infer_query_type(context, &select))
}

fn column_query(column: &str) -> Query {
    Query::pipeline(vec![Query::navigate(column)])
}

fn group_by_columns(context: &Context) -> Vec<String> {
    context
        .ty
        .as_record()
        .and_then(|record| context.domain.attributes_of(record))
        .map(|attributes| {
            attributes
                .iter()
                .filter(|(_, attribute)| attribute.group_by)
                .map(|(name, _)| name.to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Up to `column_limit` single-valued, non-grouping attributes: priority
/// names first, then declaration order
fn seed_columns(context: &Context, options: &ReconcileOptions) -> Vec<String> {
    let Some(attributes) = context
        .ty
        .as_record()
        .and_then(|record| context.domain.attributes_of(record))
    else {
        return Vec::new();
    };

    let eligible = |name: &str| {
        attributes
            .get(name)
            .is_some_and(|attribute| !attribute.ty.is_seq() && !attribute.group_by)
    };
    let priority = options.column_priority.iter().map(String::as_str);
    let mut columns: Vec<String> = Vec::new();
    for name in priority.chain(attributes.keys()) {
        if columns.len() >= options.column_limit {
            break;
        }
        if eligible(name) && !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, ScalarKind, Type};

    fn text() -> Attribute {
        Attribute::new(Type::scalar(ScalarKind::Text))
    }

    fn patient_domain() -> Arc<Domain> {
        Domain::builder()
            .entity(
                "patient",
                "Patient",
                [
                    ("id", text()),
                    ("name", text()),
                    ("age", Attribute::new(Type::scalar(ScalarKind::Number)).grouped()),
                    ("notes", Attribute::new(Type::scalar(ScalarKind::Text).seq())),
                ],
            )
            .build()
    }

    fn wide_domain() -> Arc<Domain> {
        Domain::builder()
            .entity(
                "thing",
                "Thing",
                [
                    ("a", text()),
                    ("b", text()),
                    ("type", text()),
                    ("c", text()),
                    ("key", text()),
                    ("d", text()),
                    ("e", text()),
                    ("f", text()),
                ],
            )
            .build()
    }

    fn normalized(domain: &Arc<Domain>, steps: Vec<Query>) -> Query {
        normalize(domain, &Query::pipeline(steps), &ReconcileOptions::default())
    }

    #[test]
    fn test_group_by_column_forced_first() {
        let query = normalized(&patient_domain(), vec![Query::navigate("patient")]);
        assert_eq!(
            query.to_string(),
            "pipeline(navigate(patient), select(age: pipeline(navigate(age)), \
             id: pipeline(navigate(id)), name: pipeline(navigate(name))))"
        );
    }

    #[test]
    fn test_cap_and_priority() {
        let query = normalized(&wide_domain(), vec![Query::navigate("thing")]);
        let select = query.select_tail().unwrap();
        assert_eq!(
            select.fields().unwrap().keys().collect::<Vec<_>>(),
            vec!["key", "type", "a", "b", "c"]
        );
    }

    #[test]
    fn test_column_limit_from_options() {
        let options = ReconcileOptions {
            column_limit: 2,
            column_priority: vec!["f".to_string()],
        };
        let query = normalize(
            &wide_domain(),
            &Query::pipeline(vec![Query::navigate("thing")]),
            &options,
        );
        let select = query.select_tail().unwrap();
        assert_eq!(select.fields().unwrap().keys().collect::<Vec<_>>(), vec!["f", "a"]);
    }

    #[test]
    fn test_existing_select_gets_missing_group_by_prepended() {
        let select = Query::select([("name", Query::navigate("name"))].into_iter().collect());
        let select_id = select.id;
        let query = normalized(&patient_domain(), vec![Query::navigate("patient"), select]);
        let tail = query.select_tail().unwrap();
        assert_eq!(tail.id, select_id);
        assert_eq!(tail.fields().unwrap().keys().collect::<Vec<_>>(), vec!["age", "name"]);
    }

    #[test]
    fn test_invalid_fields_pruned() {
        let select = Query::select(
            [("bogus", Query::navigate("bogus")), ("id", Query::navigate("id"))]
                .into_iter()
                .collect(),
        );
        let query = normalized(&patient_domain(), vec![Query::navigate("patient"), select]);
        let tail = query.select_tail().unwrap();
        assert_eq!(tail.fields().unwrap().keys().collect::<Vec<_>>(), vec!["age", "id"]);
    }

    #[test]
    fn test_all_invalid_fields_reseeded() {
        let select = Query::select([("bogus", Query::navigate("bogus"))].into_iter().collect());
        let query = normalized(&patient_domain(), vec![Query::navigate("patient"), select]);
        let tail = query.select_tail().unwrap();
        assert_eq!(
            tail.fields().unwrap().keys().collect::<Vec<_>>(),
            vec!["age", "id", "name"]
        );
    }

    #[test]
    fn test_scalar_pipeline_gets_no_select() {
        let query = normalized(
            &patient_domain(),
            vec![Query::navigate("patient"), Query::navigate("name")],
        );
        assert!(query.select_tail().is_none());

        let query = normalized(
            &patient_domain(),
            vec![Query::navigate("patient"), Query::aggregate("count")],
        );
        assert_eq!(query.to_string(), "pipeline(navigate(patient), aggregate(count))");
    }

    #[test]
    fn test_invalid_pipeline_untouched() {
        let query = normalized(&patient_domain(), vec![Query::navigate("nope")]);
        assert_eq!(query.to_string(), "pipeline(navigate(nope))");
    }

    #[test]
    fn test_empty_select_dropped_behind_invalid_navigation() {
        let query = normalized(
            &patient_domain(),
            vec![Query::navigate("nope"), Query::select(Fields::new())],
        );
        assert_eq!(query.to_string(), "pipeline(navigate(nope))");
        assert!(query.select_tail().is_none());
    }

    #[test]
    fn test_invalid_select_kept_behind_invalid_navigation() {
        let select = Query::select([("id", Query::navigate("id"))].into_iter().collect());
        let select_id = select.id;
        let query = normalized(&patient_domain(), vec![Query::navigate("nope"), select]);
        assert_eq!(query.select_tail().unwrap().id, select_id);
    }

    #[test]
    fn test_select_only_pipeline_starts_from_here() {
        let select = Query::select([("p", Query::navigate("patient"))].into_iter().collect());
        let select_id = select.id;
        let query = normalized(&patient_domain(), vec![select]);

        let steps = query.steps().unwrap();
        assert_eq!(steps.len(), 2);
        assert!(matches!(steps[0].kind, QueryKind::Here));
        assert_eq!(steps[1].id, select_id);
        assert_eq!(query.to_string(), "pipeline(here, select(p: pipeline(navigate(patient))))");
    }

    #[test]
    fn test_define_bindings_reconciled() {
        let query = normalized(
            &patient_domain(),
            vec![Query::define("p", Query::navigate("patient")), Query::here()],
        );
        let QueryKind::Define { binding } = &query.steps().unwrap()[0].kind else {
            panic!("expected define");
        };
        assert!(binding.query.select_tail().is_some());
    }

    #[test]
    fn test_idempotent() {
        let domain = patient_domain();
        let options = ReconcileOptions::default();
        let once = normalized(&domain, vec![Query::navigate("patient")]);
        let twice = normalize(&domain, &once, &options);
        assert_eq!(once.to_string(), twice.to_string());
        assert_eq!(once.select_tail().unwrap().id, twice.select_tail().unwrap().id);
    }
}
