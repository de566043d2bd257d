use rusqlite::ffi;

use freebase_core::{PropertyField, TopicId, TopicKey};
use freebase_storage::{
    DuplicatePair, LanguageFacet, LanguageValue, MergeStats, PropertyRecord, StorageError, Store,
    TableCounts, TopicRecord, TypeAssertion, WriteOutcome,
};

/// Wraps a store and fails the next `failures` facet writes with
/// `SQLITE_BUSY`, the way a locked database file would.
pub struct FlakyStore<S> {
    inner: S,
    failures: u32,
    reconnects: u32,
}

impl<S: Store> FlakyStore<S> {
    pub fn new(inner: S, failures: u32) -> Self {
        Self {
            inner,
            failures,
            reconnects: 0,
        }
    }

    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    fn trip(&mut self) -> Result<(), StorageError> {
        if self.failures == 0 {
            return Ok(());
        }
        self.failures -= 1;
        Err(StorageError::Sqlite(rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        )))
    }
}

impl<S: Store> Store for FlakyStore<S> {
    fn reconnect(&mut self) -> Result<(), StorageError> {
        self.reconnects += 1;
        self.inner.reconnect()
    }

    fn find_topic(&self, key: &TopicKey) -> Result<Option<TopicId>, StorageError> {
        self.inner.find_topic(key)
    }

    fn insert_topic(&mut self, key: &TopicKey) -> Result<Option<TopicId>, StorageError> {
        self.inner.insert_topic(key)
    }

    fn insert_topic_pair(&mut self, mid: &str, textid: &str) -> Result<WriteOutcome, StorageError> {
        self.trip()?;
        self.inner.insert_topic_pair(mid, textid)
    }

    fn insert_language_value(
        &mut self,
        facet: LanguageFacet,
        topic_id: TopicId,
        language: &str,
        value: &str,
    ) -> Result<WriteOutcome, StorageError> {
        self.trip()?;
        self.inner
            .insert_language_value(facet, topic_id, language, value)
    }

    fn insert_type(
        &mut self,
        topic_id: TopicId,
        type_id: TopicId,
        notable: bool,
    ) -> Result<WriteOutcome, StorageError> {
        self.trip()?;
        self.inner.insert_type(topic_id, type_id, notable)
    }

    fn promote_notable(
        &mut self,
        topic_id: TopicId,
        type_id: TopicId,
    ) -> Result<WriteOutcome, StorageError> {
        self.trip()?;
        self.inner.promote_notable(topic_id, type_id)
    }

    fn insert_key(&mut self, topic_id: TopicId, key: &str) -> Result<WriteOutcome, StorageError> {
        self.trip()?;
        self.inner.insert_key(topic_id, key)
    }

    fn upsert_property_field(
        &mut self,
        topic_id: TopicId,
        field: PropertyField,
        value: TopicId,
    ) -> Result<WriteOutcome, StorageError> {
        self.trip()?;
        self.inner.upsert_property_field(topic_id, field, value)
    }

    fn upsert_property_unique(
        &mut self,
        topic_id: TopicId,
        unique: bool,
    ) -> Result<WriteOutcome, StorageError> {
        self.trip()?;
        self.inner.upsert_property_unique(topic_id, unique)
    }

    fn topic(&self, id: TopicId) -> Result<Option<TopicRecord>, StorageError> {
        self.inner.topic(id)
    }

    fn topic_by_mid(&self, mid: &str) -> Result<Option<TopicRecord>, StorageError> {
        self.inner.topic_by_mid(mid)
    }

    fn topic_by_textid(&self, textid: &str) -> Result<Option<TopicRecord>, StorageError> {
        self.inner.topic_by_textid(textid)
    }

    fn topics_by_key(&self, key: &str) -> Result<Vec<TopicRecord>, StorageError> {
        self.inner.topics_by_key(key)
    }

    fn language_values(
        &self,
        facet: LanguageFacet,
        topic_id: TopicId,
    ) -> Result<Vec<LanguageValue>, StorageError> {
        self.inner.language_values(facet, topic_id)
    }

    fn types(&self, topic_id: TopicId) -> Result<Vec<TypeAssertion>, StorageError> {
        self.inner.types(topic_id)
    }

    fn keys(&self, topic_id: TopicId) -> Result<Vec<String>, StorageError> {
        self.inner.keys(topic_id)
    }

    fn property(&self, topic_id: TopicId) -> Result<Option<PropertyRecord>, StorageError> {
        self.inner.property(topic_id)
    }

    fn counts(&self) -> Result<TableCounts, StorageError> {
        self.inner.counts()
    }

    fn references_to(&self, topic_id: TopicId) -> Result<u64, StorageError> {
        self.inner.references_to(topic_id)
    }

    fn find_duplicate_pairs(&self) -> Result<Vec<DuplicatePair>, StorageError> {
        self.inner.find_duplicate_pairs()
    }

    fn merge_topics(&mut self, pair: &DuplicatePair) -> Result<Option<MergeStats>, StorageError> {
        self.inner.merge_topics(pair)
    }
}
