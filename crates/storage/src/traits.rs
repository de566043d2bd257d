use serde::Serialize;

use freebase_core::{MAX_LANGUAGE_SIZE, MAX_VARCHAR_SIZE, PropertyField, TopicId, TopicKey};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRecord {
    pub id: TopicId,
    pub mid: Option<String>,
    pub textid: Option<String>,
}

/// Row of `labels`, `descriptions` or `aliases`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageValue {
    pub topic_id: TopicId,
    pub language: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAssertion {
    pub topic_id: TopicId,
    pub type_id: TopicId,
    pub notable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRecord {
    pub topic_id: TopicId,
    pub schema_id: Option<TopicId>,
    pub expected_type_id: Option<TopicId>,
    pub unique: Option<bool>,
    pub master_id: Option<TopicId>,
    pub reverse_id: Option<TopicId>,
    pub unit_id: Option<TopicId>,
    pub delegated_id: Option<TopicId>,
}

impl PropertyRecord {
    pub fn field(&self, field: PropertyField) -> Option<TopicId> {
        match field {
            PropertyField::Schema => self.schema_id,
            PropertyField::ExpectedType => self.expected_type_id,
            PropertyField::MasterProperty => self.master_id,
            PropertyField::ReverseProperty => self.reverse_id,
            PropertyField::Unit => self.unit_id,
            PropertyField::Delegated => self.delegated_id,
        }
    }
}

/// The three language-tagged text facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageFacet {
    Label,
    Description,
    Alias,
}

impl LanguageFacet {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Label => "labels",
            Self::Description => "descriptions",
            Self::Alias => "aliases",
        }
    }

    /// Values at or above this many characters are rejected.
    pub fn max_len(&self) -> Option<usize> {
        match self {
            Self::Label | Self::Alias => Some(MAX_VARCHAR_SIZE),
            Self::Description => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ValueTooLong { len: usize, max: usize },
    LanguageTooLong(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValueTooLong { len, max } => {
                write!(f, "value of {len} characters exceeds limit of {max}")
            }
            Self::LanguageTooLong(tag) => write!(
                f,
                "language tag {tag:?} is longer than {MAX_LANGUAGE_SIZE} characters"
            ),
        }
    }
}

/// Result of a single facet write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    AlreadyExists,
    Updated,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub topics: u64,
    pub labels: u64,
    pub descriptions: u64,
    pub aliases: u64,
    pub types: u64,
    pub keys: u64,
    pub properties: u64,
}

/// Two topics the dump split apart: a key of `from_id` equals the textid of
/// `to_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicatePair {
    pub from_id: TopicId,
    pub to_id: TopicId,
    pub textid: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Facet rows rewritten to point at the surviving topic.
    pub repointed: u64,
    /// Facet rows discarded because the surviving topic already had them.
    pub dropped: u64,
}

pub trait Store {
    /// Replace the underlying connection with a fresh one.
    fn reconnect(&mut self) -> Result<(), StorageError>;

    fn find_topic(&self, key: &TopicKey) -> Result<Option<TopicId>, StorageError>;

    /// Insert a topic with only `key` set. `Ok(None)` means another row
    /// already owns the key.
    fn insert_topic(&mut self, key: &TopicKey) -> Result<Option<TopicId>, StorageError>;

    /// Record a mid → textid mapping from the identity pre-pass.
    fn insert_topic_pair(&mut self, mid: &str, textid: &str)
        -> Result<WriteOutcome, StorageError>;

    fn insert_language_value(
        &mut self,
        facet: LanguageFacet,
        topic_id: TopicId,
        language: &str,
        value: &str,
    ) -> Result<WriteOutcome, StorageError>;

    fn insert_type(
        &mut self,
        topic_id: TopicId,
        type_id: TopicId,
        notable: bool,
    ) -> Result<WriteOutcome, StorageError>;

    /// Set `notable` on an existing assertion. Never clears it.
    fn promote_notable(
        &mut self,
        topic_id: TopicId,
        type_id: TopicId,
    ) -> Result<WriteOutcome, StorageError>;

    fn insert_key(&mut self, topic_id: TopicId, key: &str) -> Result<WriteOutcome, StorageError>;

    fn upsert_property_field(
        &mut self,
        topic_id: TopicId,
        field: PropertyField,
        value: TopicId,
    ) -> Result<WriteOutcome, StorageError>;

    fn upsert_property_unique(
        &mut self,
        topic_id: TopicId,
        unique: bool,
    ) -> Result<WriteOutcome, StorageError>;

    fn topic(&self, id: TopicId) -> Result<Option<TopicRecord>, StorageError>;

    fn topic_by_mid(&self, mid: &str) -> Result<Option<TopicRecord>, StorageError>;

    fn topic_by_textid(&self, textid: &str) -> Result<Option<TopicRecord>, StorageError>;

    fn topics_by_key(&self, key: &str) -> Result<Vec<TopicRecord>, StorageError>;

    fn language_values(
        &self,
        facet: LanguageFacet,
        topic_id: TopicId,
    ) -> Result<Vec<LanguageValue>, StorageError>;

    fn types(&self, topic_id: TopicId) -> Result<Vec<TypeAssertion>, StorageError>;

    fn keys(&self, topic_id: TopicId) -> Result<Vec<String>, StorageError>;

    fn property(&self, topic_id: TopicId) -> Result<Option<PropertyRecord>, StorageError>;

    fn counts(&self) -> Result<TableCounts, StorageError>;

    /// Number of facet rows that mention `topic_id` in any column.
    fn references_to(&self, topic_id: TopicId) -> Result<u64, StorageError>;

    fn find_duplicate_pairs(&self) -> Result<Vec<DuplicatePair>, StorageError>;

    /// Fold `pair.from_id` into `pair.to_id` in one transaction. `Ok(None)`
    /// when either topic no longer exists.
    fn merge_topics(&mut self, pair: &DuplicatePair) -> Result<Option<MergeStats>, StorageError>;

    fn labels(&self, topic_id: TopicId) -> Result<Vec<LanguageValue>, StorageError> {
        self.language_values(LanguageFacet::Label, topic_id)
    }

    fn descriptions(&self, topic_id: TopicId) -> Result<Vec<LanguageValue>, StorageError> {
        self.language_values(LanguageFacet::Description, topic_id)
    }

    fn aliases(&self, topic_id: TopicId) -> Result<Vec<LanguageValue>, StorageError> {
        self.language_values(LanguageFacet::Alias, topic_id)
    }
}
