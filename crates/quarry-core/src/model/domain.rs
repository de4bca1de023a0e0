//! Domain (schema) description consumed by type inference.
//!
//! A [`Domain`] lists the entities a query can start from and the aggregates
//! it can apply. It is built in code with [`DomainBuilder`] or loaded from the
//! JSON layout produced by schema introspection via [`Domain::from_json`].

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;

use super::types::{Attribute, Cardinality, RecordType, ScalarKind, Type};
use super::Fields;
use crate::error::DocumentError;

static EMPTY_DOMAIN: Lazy<Arc<Domain>> = Lazy::new(|| Arc::new(Domain::default()));

/// A domain entity
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Display title
    pub title: String,
    /// Attributes in declaration order
    pub attributes: Fields<Attribute>,
}

/// Which element types an aggregate accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregateInput {
    /// Any element type
    Any,
    /// Scalar elements only
    Scalar,
    /// Numeric elements only
    Number,
}

/// Result type of an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregateOutput {
    /// A number
    Number,
    /// A boolean
    Boolean,
    /// The element type of the input
    SameAsInput,
}

/// Describes an aggregate function
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggregateDescriptor {
    /// Display title
    pub title: String,
    /// Accepted element types
    pub accepts: AggregateInput,
    /// Result type
    pub result: AggregateOutput,
}

impl AggregateDescriptor {
    /// Create a descriptor
    pub fn new(title: impl Into<String>, accepts: AggregateInput, result: AggregateOutput) -> Self {
        Self {
            title: title.into(),
            accepts,
            result,
        }
    }

    /// Result type of applying this aggregate to elements of type `element`,
    /// or `None` when the element type is not accepted.
    pub fn apply(&self, element: &Type) -> Option<Type> {
        let element = element.clone().one();
        let accepted = match self.accepts {
            AggregateInput::Any => !element.is_invalid() && !element.is_void(),
            AggregateInput::Scalar => element.as_scalar().is_some(),
            AggregateInput::Number => element.as_scalar() == Some(ScalarKind::Number),
        };
        if !accepted {
            return None;
        }
        Some(match self.result {
            AggregateOutput::Number => Type::scalar(ScalarKind::Number),
            AggregateOutput::Boolean => Type::scalar(ScalarKind::Boolean),
            AggregateOutput::SameAsInput => element,
        })
    }
}

fn default_aggregates() -> Fields<AggregateDescriptor> {
    use AggregateInput as In;
    use AggregateOutput as Out;
    [
        ("count", AggregateDescriptor::new("Count", In::Any, Out::Number)),
        ("exists", AggregateDescriptor::new("Exists", In::Any, Out::Boolean)),
        ("sum", AggregateDescriptor::new("Sum", In::Number, Out::Number)),
        ("avg", AggregateDescriptor::new("Average", In::Number, Out::Number)),
        ("min", AggregateDescriptor::new("Min", In::Scalar, Out::SameAsInput)),
        ("max", AggregateDescriptor::new("Max", In::Scalar, Out::SameAsInput)),
    ]
    .into_iter()
    .collect()
}

/// Entities and aggregates available to queries
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    /// Root entities in declaration order
    pub entities: Fields<Entity>,
    /// Aggregate functions
    pub aggregates: Fields<AggregateDescriptor>,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            entities: Fields::new(),
            aggregates: default_aggregates(),
        }
    }
}

impl Domain {
    /// Start building a domain with the default aggregates
    pub fn builder() -> DomainBuilder {
        DomainBuilder {
            domain: Domain::default(),
        }
    }

    /// The shared empty domain
    pub fn empty() -> Arc<Domain> {
        Arc::clone(&EMPTY_DOMAIN)
    }

    /// Look up an entity
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Look up an aggregate
    pub fn aggregate(&self, name: &str) -> Option<&AggregateDescriptor> {
        self.aggregates.get(name)
    }

    /// Attributes of a record type: inline ones when present, otherwise the
    /// entity's. Unknown entities have no attributes.
    pub fn attributes_of<'a>(&'a self, record: &'a RecordType) -> Option<&'a Fields<Attribute>> {
        if let Some(attributes) = &record.attributes {
            return Some(attributes.as_ref());
        }
        record
            .entity
            .as_deref()
            .and_then(|name| self.entity(name))
            .map(|entity| &entity.attributes)
    }

    /// Load a domain from its JSON document.
    ///
    /// Attribute `type` is either a scalar kind name or the name of another
    /// entity in the same document. Aggregates listed in the document are
    /// added to (or override) the defaults.
    pub fn from_json(json: &str) -> Result<Domain, DocumentError> {
        let doc: DomainDoc = serde_json::from_str(json)?;
        Domain::from_doc(doc)
    }

    fn from_doc(doc: DomainDoc) -> Result<Domain, DocumentError> {
        let mut domain = Domain::default();
        for (name, entity) in doc.entity.iter() {
            let mut attributes = Fields::new();
            for (attr_name, attr) in entity.attribute.iter() {
                let base = match ScalarKind::from_name(&attr.ty) {
                    Some(kind) => Type::scalar(kind),
                    None if doc.entity.contains_key(&attr.ty) => Type::entity(attr.ty.clone()),
                    None => {
                        return Err(DocumentError::Invalid(format!(
                            "attribute '{name}.{attr_name}' has unknown type '{}'",
                            attr.ty
                        )))
                    }
                };
                attributes.insert(
                    attr_name,
                    Attribute {
                        ty: base.with_card(attr.card),
                        title: attr.title.clone(),
                        group_by: attr.group_by,
                    },
                );
            }
            domain.entities.insert(
                name,
                Entity {
                    title: entity.title.clone().unwrap_or_else(|| name.to_string()),
                    attributes,
                },
            );
        }
        for (name, aggregate) in doc.aggregate {
            domain.aggregates.insert(name, aggregate);
        }
        Ok(domain)
    }
}

/// Incremental domain construction
#[derive(Debug, Clone)]
pub struct DomainBuilder {
    domain: Domain,
}

impl DomainBuilder {
    /// Add an entity with the given attributes
    pub fn entity<I, K>(mut self, name: &str, title: &str, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        self.domain.entities.insert(
            name,
            Entity {
                title: title.to_string(),
                attributes: attributes.into_iter().collect(),
            },
        );
        self
    }

    /// Add or override an aggregate
    pub fn aggregate(mut self, name: &str, descriptor: AggregateDescriptor) -> Self {
        self.domain.aggregates.insert(name, descriptor);
        self
    }

    /// Finish building
    pub fn build(self) -> Arc<Domain> {
        Arc::new(self.domain)
    }
}

// ============================================================================
// JSON document layout
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DomainDoc {
    #[serde(default)]
    entity: Fields<EntityDoc>,
    #[serde(default)]
    aggregate: Fields<AggregateDescriptor>,
}

#[derive(Debug, Deserialize)]
struct EntityDoc {
    title: Option<String>,
    #[serde(default)]
    attribute: Fields<AttributeDoc>,
}

#[derive(Debug, Deserialize)]
struct AttributeDoc {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    card: Cardinality,
    title: Option<String>,
    #[serde(default, rename = "groupBy")]
    group_by: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = r#"{
        "entity": {
            "patient": {
                "title": "Patient",
                "attribute": {
                    "id": {"type": "text"},
                    "age": {"type": "number", "groupBy": true},
                    "visit": {"type": "visit", "card": "seq", "title": "Visits"}
                }
            },
            "visit": {
                "attribute": {
                    "code": {"type": "text"},
                    "patient": {"type": "patient"}
                }
            }
        },
        "aggregate": {
            "median": {"title": "Median", "accepts": "number", "result": "number"}
        }
    }"#;

    #[test]
    fn test_from_json() {
        let domain = Domain::from_json(DOMAIN).unwrap();
        assert_eq!(domain.entities.keys().collect::<Vec<_>>(), vec!["patient", "visit"]);

        let patient = domain.entity("patient").unwrap();
        assert_eq!(patient.title, "Patient");
        assert_eq!(
            patient.attributes.keys().collect::<Vec<_>>(),
            vec!["id", "age", "visit"]
        );
        assert!(patient.attributes.get("age").unwrap().group_by);

        let visit = patient.attributes.get("visit").unwrap();
        assert_eq!(visit.ty, Type::entity("visit").seq());
        assert_eq!(visit.title.as_deref(), Some("Visits"));

        // untitled entities fall back to their name
        assert_eq!(domain.entity("visit").unwrap().title, "visit");
        assert!(domain.aggregate("median").is_some());
        assert!(domain.aggregate("count").is_some());
    }

    #[test]
    fn test_from_json_rejects_unknown_attribute_type() {
        let json = r#"{"entity": {"a": {"attribute": {"b": {"type": "nope"}}}}}"#;
        let err = Domain::from_json(json).unwrap_err();
        assert!(err.to_string().contains("a.b"));
    }

    #[test]
    fn test_aggregate_apply() {
        let domain = Domain::default();
        let number = Type::scalar(ScalarKind::Number).seq();
        let text = Type::scalar(ScalarKind::Text).seq();
        let patients = Type::entity("patient").seq();

        let count = domain.aggregate("count").unwrap();
        assert_eq!(count.apply(&patients), Some(Type::scalar(ScalarKind::Number)));

        let sum = domain.aggregate("sum").unwrap();
        assert_eq!(sum.apply(&number), Some(Type::scalar(ScalarKind::Number)));
        assert_eq!(sum.apply(&text), None);

        let max = domain.aggregate("max").unwrap();
        assert_eq!(max.apply(&text), Some(Type::scalar(ScalarKind::Text)));
        assert_eq!(max.apply(&patients), None);
    }

    #[test]
    fn test_attributes_of_prefers_inline() {
        let domain = Domain::builder()
            .entity(
                "patient",
                "Patient",
                [("id", Attribute::new(Type::scalar(ScalarKind::Text)))],
            )
            .build();
        let by_entity = Type::entity("patient");
        let record = by_entity.as_record().unwrap();
        assert_eq!(domain.attributes_of(record).unwrap().len(), 1);

        let inline = Type::record(Some("patient".into()), Fields::new());
        assert_eq!(domain.attributes_of(inline.as_record().unwrap()).unwrap().len(), 0);

        let unknown = Type::entity("nope");
        assert!(domain.attributes_of(unknown.as_record().unwrap()).is_none());
    }
}
