//! Predicate vocabulary understood by the loader.

use serde::Serialize;

use crate::topic_key::NAMESPACE;

pub const TYPE_OBJECT_ID: &str = "http://rdf.freebase.com/ns/type.object.id";
pub const TYPE_OBJECT_NAME: &str = "http://rdf.freebase.com/ns/type.object.name";
pub const TYPE_OBJECT_TYPE: &str = "http://rdf.freebase.com/ns/type.object.type";
pub const TYPE_OBJECT_KEY: &str = "http://rdf.freebase.com/ns/type.object.key";
pub const COMMON_TOPIC_DESCRIPTION: &str = "http://rdf.freebase.com/ns/common.topic.description";
pub const COMMON_TOPIC_ALIAS: &str = "http://rdf.freebase.com/ns/common.topic.alias";
pub const COMMON_TOPIC_NOTABLE_TYPES: &str =
    "http://rdf.freebase.com/ns/common.topic.notable_types";
pub const TYPE_PROPERTY_SCHEMA: &str = "http://rdf.freebase.com/ns/type.property.schema";
pub const TYPE_PROPERTY_EXPECTED_TYPE: &str =
    "http://rdf.freebase.com/ns/type.property.expected_type";
pub const TYPE_PROPERTY_UNIQUE: &str = "http://rdf.freebase.com/ns/type.property.unique";
pub const TYPE_PROPERTY_MASTER: &str = "http://rdf.freebase.com/ns/type.property.master_property";
pub const TYPE_PROPERTY_REVERSE: &str =
    "http://rdf.freebase.com/ns/type.property.reverse_property";
pub const TYPE_PROPERTY_UNIT: &str = "http://rdf.freebase.com/ns/type.property.unit";
pub const TYPE_PROPERTY_DELEGATED: &str = "http://rdf.freebase.com/ns/type.property.delegated";

/// Topic-valued columns of the `properties` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyField {
    Schema,
    ExpectedType,
    MasterProperty,
    ReverseProperty,
    Unit,
    Delegated,
}

impl PropertyField {
    pub const ALL: [PropertyField; 6] = [
        Self::Schema,
        Self::ExpectedType,
        Self::MasterProperty,
        Self::ReverseProperty,
        Self::Unit,
        Self::Delegated,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Self::Schema => "schema_id",
            Self::ExpectedType => "expected_type_id",
            Self::MasterProperty => "master_id",
            Self::ReverseProperty => "reverse_id",
            Self::Unit => "unit_id",
            Self::Delegated => "delegated_id",
        }
    }
}

/// What a predicate means to the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// mid → textid mapping, applied by the identity pre-pass only.
    ObjectId,
    Label,
    Description,
    Alias,
    Type,
    NotableType,
    Key,
    PropertyField(PropertyField),
    UniqueFlag,
}

impl PredicateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectId => "object_id",
            Self::Label => "label",
            Self::Description => "description",
            Self::Alias => "alias",
            Self::Type => "type",
            Self::NotableType => "notable_type",
            Self::Key => "key",
            Self::PropertyField(PropertyField::Schema) => "schema",
            Self::PropertyField(PropertyField::ExpectedType) => "expected_type",
            Self::PropertyField(PropertyField::MasterProperty) => "master_property",
            Self::PropertyField(PropertyField::ReverseProperty) => "reverse_property",
            Self::PropertyField(PropertyField::Unit) => "unit",
            Self::PropertyField(PropertyField::Delegated) => "delegated",
            Self::UniqueFlag => "unique",
        }
    }
}

/// The built-in predicate table.
pub fn builtin_predicates() -> [(&'static str, PredicateKind); 14] {
    [
        (TYPE_OBJECT_ID, PredicateKind::ObjectId),
        (TYPE_OBJECT_NAME, PredicateKind::Label),
        (COMMON_TOPIC_DESCRIPTION, PredicateKind::Description),
        (COMMON_TOPIC_ALIAS, PredicateKind::Alias),
        (TYPE_OBJECT_TYPE, PredicateKind::Type),
        (COMMON_TOPIC_NOTABLE_TYPES, PredicateKind::NotableType),
        (TYPE_OBJECT_KEY, PredicateKind::Key),
        (
            TYPE_PROPERTY_SCHEMA,
            PredicateKind::PropertyField(PropertyField::Schema),
        ),
        (
            TYPE_PROPERTY_EXPECTED_TYPE,
            PredicateKind::PropertyField(PropertyField::ExpectedType),
        ),
        (TYPE_PROPERTY_UNIQUE, PredicateKind::UniqueFlag),
        (
            TYPE_PROPERTY_MASTER,
            PredicateKind::PropertyField(PropertyField::MasterProperty),
        ),
        (
            TYPE_PROPERTY_REVERSE,
            PredicateKind::PropertyField(PropertyField::ReverseProperty),
        ),
        (
            TYPE_PROPERTY_UNIT,
            PredicateKind::PropertyField(PropertyField::Unit),
        ),
        (
            TYPE_PROPERTY_DELEGATED,
            PredicateKind::PropertyField(PropertyField::Delegated),
        ),
    ]
}

/// Full IRI for a dotted local name, e.g. `ns("type.object.name")`.
pub fn ns(local: &str) -> String {
    format!("{NAMESPACE}/{local}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_iris_live_in_the_namespace() {
        for (iri, kind) in builtin_predicates() {
            assert!(iri.starts_with(NAMESPACE), "{iri}");
            let local = &iri[NAMESPACE.len() + 1..];
            assert_eq!(ns(local), iri, "{}", kind.as_str());
        }
    }

    #[test]
    fn property_columns_are_distinct() {
        let mut columns: Vec<_> = PropertyField::ALL.iter().map(|f| f.column()).collect();
        columns.sort();
        columns.dedup();
        assert_eq!(columns.len(), PropertyField::ALL.len());
    }
}
