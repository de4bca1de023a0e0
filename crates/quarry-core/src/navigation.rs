//! Navigation options for column pickers and group menus.
//!
//! These helpers read inferred contexts only; they never edit. Pickers use
//! them to list what can be followed from a node, which of those are already
//! shown, and which attributes a `group` step can use.

use serde::Serialize;

use crate::model::{
    transform_query, Cardinality, Fields, Query, QueryFold, QueryId, QueryKind, Type,
};

/// What a navigation leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationKind {
    /// An entity, relationship or bound query
    Record,
    /// A scalar attribute
    Attribute,
}

/// One followable name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigation {
    /// Name to pass to `navigate`
    pub value: String,
    /// Display label
    pub label: String,
    /// Record or attribute
    pub kind: NavigationKind,
    /// Cardinality of the target
    pub card: Cardinality,
    /// Type reached by following it
    #[serde(skip)]
    pub ty: Type,
    /// The attribute is a grouping column
    pub group_by: bool,
    /// Comes from a `define` binding in scope
    pub from_query: bool,
}

/// Names that can be followed from `query`.
///
/// For a `select`, or a node whose type is invalid, options are computed from
/// the node's input type instead of its output.
pub fn navigation_options(query: &Query) -> Vec<Navigation> {
    let context = &query.context;
    let ty = if query.is_select() || context.ty.is_invalid() {
        context.input().ty
    } else {
        context.ty.clone()
    };

    let mut options = Vec::new();
    if ty.is_void() {
        for (name, entity) in context.domain.entities.iter() {
            options.push(Navigation {
                value: name.to_string(),
                label: entity.title.clone(),
                kind: NavigationKind::Record,
                card: Cardinality::Seq,
                ty: Type::entity(name).seq(),
                group_by: false,
                from_query: false,
            });
        }
    } else if let Some(attributes) = ty
        .as_record()
        .and_then(|record| context.domain.attributes_of(record))
    {
        for (name, attribute) in attributes.iter() {
            options.push(Navigation {
                value: name.to_string(),
                label: attribute.title.clone().unwrap_or_else(|| name.to_string()),
                kind: if attribute.ty.as_record().is_some() {
                    NavigationKind::Record
                } else {
                    NavigationKind::Attribute
                },
                card: attribute.ty.card,
                ty: attribute.ty.clone().with_card(ty.card.compose(attribute.ty.card)),
                group_by: attribute.group_by,
                from_query: false,
            });
        }
    }

    for (name, binding) in context.scope.iter() {
        options.push(Navigation {
            value: name.to_string(),
            label: binding
                .query
                .context
                .title
                .clone()
                .unwrap_or_else(|| name.to_string()),
            kind: NavigationKind::Record,
            card: ty.card,
            ty: binding.query.ty().clone(),
            group_by: false,
            from_query: true,
        });
    }
    options
}

/// Names already shown by `query`, mapped to the node showing them.
///
/// For a pipeline this is decided by its last step: a trailing select shows
/// its fields, a trailing navigate shows its path.
pub fn active_navigation(query: &Query) -> Fields<QueryId> {
    transform_query(query, &mut ActiveNavigation)
}

struct ActiveNavigation;

impl<'a> QueryFold<'a> for ActiveNavigation {
    type Output = Fields<QueryId>;

    fn otherwise(&mut self, _query: &'a Query) -> Self::Output {
        Fields::new()
    }

    fn navigate(&mut self, query: &'a Query, path: &'a str) -> Self::Output {
        [(path, query.id)].into_iter().collect()
    }

    fn select(&mut self, _query: &'a Query, fields: &'a Fields<Query>) -> Self::Output {
        fields.iter().map(|(name, field)| (name, field.id)).collect()
    }

    fn pipeline(&mut self, _query: &'a Query, steps: &'a [Query]) -> Self::Output {
        match steps.last() {
            Some(last) => transform_query(last, self),
            None => Fields::new(),
        }
    }
}

/// A column offered by a group menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOption {
    /// Attribute name
    pub name: String,
    /// Display label
    pub label: String,
    /// Already part of `by_path`
    pub selected: bool,
}

/// Attributes of the input of `query` that can be grouped by: single-valued,
/// valid, non-record. `selected` reflects `by_path` when `query` is a group.
pub fn group_by_options(query: &Query) -> Vec<GroupOption> {
    let by_path: &[String] = match &query.kind {
        QueryKind::Group { by_path } => by_path,
        _ => &[],
    };
    let input = query.context.input();
    let Some(attributes) = input
        .ty
        .as_record()
        .and_then(|record| input.domain.attributes_of(record))
    else {
        return Vec::new();
    };
    attributes
        .iter()
        .filter(|(_, attribute)| can_group_by(&attribute.ty))
        .map(|(name, attribute)| GroupOption {
            name: name.to_string(),
            label: attribute.title.clone().unwrap_or_else(|| name.to_string()),
            selected: by_path.iter().any(|p| p == name),
        })
        .collect()
}

fn can_group_by(ty: &Type) -> bool {
    !(ty.is_invalid() || ty.as_record().is_some() || ty.is_seq())
}
