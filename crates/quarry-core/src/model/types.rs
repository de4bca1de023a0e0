//! Inferred query types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Fields;

/// How many values a query produces per input element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// Exactly one (or zero) value
    #[default]
    One,
    /// A sequence of values
    Seq,
}

impl Cardinality {
    /// Cardinality of following `other` after `self`: plural if either is.
    pub fn compose(self, other: Cardinality) -> Cardinality {
        match (self, other) {
            (Cardinality::One, Cardinality::One) => Cardinality::One,
            _ => Cardinality::Seq,
        }
    }
}

/// Kinds of scalar values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// Text
    Text,
    /// Integer or decimal
    Number,
    /// True / false
    Boolean,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Date and time
    DateTime,
    /// Opaque JSON document
    Json,
    /// One of a fixed set of labels
    Enumeration,
}

impl ScalarKind {
    /// Parse a scalar kind name as used in domain documents.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "number" | "integer" | "decimal" | "float" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "datetime" => Some(Self::DateTime),
            "json" => Some(Self::Json),
            "enumeration" => Some(Self::Enumeration),
            _ => None,
        }
    }

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Json => "json",
            Self::Enumeration => "enumeration",
        }
    }
}

/// A named attribute of a record type
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute value type
    pub ty: Type,
    /// Display title
    pub title: Option<String>,
    /// The attribute is a grouping column and must stay visible
    pub group_by: bool,
}

impl Attribute {
    /// Plain attribute with no title
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            title: None,
            group_by: false,
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Mark as a group-by column
    pub fn grouped(mut self) -> Self {
        self.group_by = true;
        self
    }
}

/// Record type payload.
///
/// A record either names a domain entity (its attributes are looked up in the
/// domain, which keeps cyclic entity graphs finite) or carries its attributes
/// inline (records produced by `select` and `group`).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    /// Domain entity this record derives from
    pub entity: Option<String>,
    /// Inline attributes; `None` means "look up `entity` in the domain"
    pub attributes: Option<Arc<Fields<Attribute>>>,
}

/// Type payload without cardinality
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Nothing flows in yet (the root of a query)
    Void,
    /// Inference failed here; absorbs downstream errors
    Invalid,
    /// A scalar value
    Scalar(ScalarKind),
    /// A record
    Record(RecordType),
}

/// An inferred type: a kind plus a cardinality
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    /// Singular or plural
    pub card: Cardinality,
    /// What the values are
    pub kind: TypeKind,
}

impl Type {
    /// The type flowing into a root query
    pub fn void() -> Self {
        Self {
            card: Cardinality::One,
            kind: TypeKind::Void,
        }
    }

    /// The error sentinel
    pub fn invalid() -> Self {
        Self {
            card: Cardinality::One,
            kind: TypeKind::Invalid,
        }
    }

    /// A single scalar
    pub fn scalar(kind: ScalarKind) -> Self {
        Self {
            card: Cardinality::One,
            kind: TypeKind::Scalar(kind),
        }
    }

    /// A single record of a domain entity
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            card: Cardinality::One,
            kind: TypeKind::Record(RecordType {
                entity: Some(name.into()),
                attributes: None,
            }),
        }
    }

    /// A single record with inline attributes
    pub fn record(entity: Option<String>, attributes: Fields<Attribute>) -> Self {
        Self {
            card: Cardinality::One,
            kind: TypeKind::Record(RecordType {
                entity,
                attributes: Some(Arc::new(attributes)),
            }),
        }
    }

    /// Same type, plural
    pub fn seq(self) -> Self {
        self.with_card(Cardinality::Seq)
    }

    /// Same type, singular (the element type of a sequence)
    pub fn one(self) -> Self {
        self.with_card(Cardinality::One)
    }

    /// Same type with the given cardinality
    pub fn with_card(mut self, card: Cardinality) -> Self {
        self.card = card;
        self
    }

    /// True for the error sentinel
    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, TypeKind::Invalid)
    }

    /// True for void
    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    /// True for plural types
    pub fn is_seq(&self) -> bool {
        self.card == Cardinality::Seq
    }

    /// Record payload, if this is a record
    pub fn as_record(&self) -> Option<&RecordType> {
        match &self.kind {
            TypeKind::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Scalar kind, if this is a scalar
    pub fn as_scalar(&self) -> Option<ScalarKind> {
        match self.kind {
            TypeKind::Scalar(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = match &self.kind {
            TypeKind::Void => "void".to_string(),
            TypeKind::Invalid => "invalid".to_string(),
            TypeKind::Scalar(kind) => kind.name().to_string(),
            TypeKind::Record(record) => match (&record.entity, &record.attributes) {
                (Some(entity), None) => entity.clone(),
                (entity, Some(attributes)) => format!(
                    "{}{{{}}}",
                    entity.as_deref().unwrap_or(""),
                    attributes.keys().collect::<Vec<_>>().join(", ")
                ),
                (None, None) => "record".to_string(),
            },
        };
        match self.card {
            Cardinality::One => f.write_str(&inner),
            Cardinality::Seq => write!(f, "seq<{inner}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Cardinality::One, Cardinality::One, Cardinality::One)]
    #[test_case(Cardinality::One, Cardinality::Seq, Cardinality::Seq)]
    #[test_case(Cardinality::Seq, Cardinality::One, Cardinality::Seq)]
    #[test_case(Cardinality::Seq, Cardinality::Seq, Cardinality::Seq)]
    fn test_compose_cardinality(a: Cardinality, b: Cardinality, expected: Cardinality) {
        assert_eq!(a.compose(b), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::entity("patient").seq().to_string(), "seq<patient>");
        assert_eq!(Type::scalar(ScalarKind::Number).to_string(), "number");
        let attrs: Fields<Attribute> = [
            ("id", Attribute::new(Type::scalar(ScalarKind::Text))),
            ("age", Attribute::new(Type::scalar(ScalarKind::Number))),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            Type::record(Some("patient".into()), attrs).to_string(),
            "patient{id, age}"
        );
    }

    #[test]
    fn test_scalar_names_round_trip() {
        for kind in [ScalarKind::Text, ScalarKind::DateTime, ScalarKind::Enumeration] {
            assert_eq!(ScalarKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ScalarKind::from_name("integer"), Some(ScalarKind::Number));
        assert_eq!(ScalarKind::from_name("patient"), None);
    }
}
