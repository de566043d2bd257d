use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use freebase_core::{MAX_LANGUAGE_SIZE, MAX_VARCHAR_SIZE, PropertyField, TopicId, TopicKey};

use crate::descriptor::StoreDescriptor;
use crate::error::StorageError;
use crate::traits::{
    DuplicatePair, LanguageFacet, LanguageValue, MergeStats, PropertyRecord, RejectReason,
    Store, TableCounts, TopicRecord, TypeAssertion, WriteOutcome,
};

pub struct SqliteStore {
    conn: Connection,
    descriptor: StoreDescriptor,
}

impl SqliteStore {
    pub fn open(descriptor: StoreDescriptor) -> Result<Self, StorageError> {
        let conn = descriptor.connect()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn, descriptor })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(StoreDescriptor::Memory)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn topic_where(
        &self,
        column: &str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<Option<TopicRecord>, StorageError> {
        let sql = format!("SELECT id, mid, textid FROM topics WHERE {column} = ?1");
        Ok(self.conn.query_row(&sql, [value], read_topic).optional()?)
    }

    fn count(&self, sql: &str, topic_id: TopicId) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row(sql, params![topic_id.as_raw()], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn read_topic(row: &rusqlite::Row) -> rusqlite::Result<TopicRecord> {
    Ok(TopicRecord {
        id: TopicId::from_raw(row.get(0)?),
        mid: row.get(1)?,
        textid: row.get(2)?,
    })
}

fn opt_id(raw: Option<i64>) -> Option<TopicId> {
    raw.map(TopicId::from_raw)
}

fn key_column(key: &TopicKey) -> &'static str {
    match key {
        TopicKey::Mid(_) => "mid",
        TopicKey::TextId(_) => "textid",
    }
}

fn length_check(value: &str, max: usize) -> Option<RejectReason> {
    let len = value.chars().count();
    (len >= max).then_some(RejectReason::ValueTooLong { len, max })
}

fn inserted(changes: usize) -> WriteOutcome {
    if changes > 0 {
        WriteOutcome::Inserted
    } else {
        WriteOutcome::AlreadyExists
    }
}

impl Store for SqliteStore {
    fn reconnect(&mut self) -> Result<(), StorageError> {
        // An in-memory database dies with its connection.
        if self.descriptor == StoreDescriptor::Memory {
            return Ok(());
        }
        debug!(descriptor = %self.descriptor, "reopening store connection");
        let conn = self.descriptor.connect()?;
        crate::schema::init_schema(&conn)?;
        self.conn = conn;
        Ok(())
    }

    fn find_topic(&self, key: &TopicKey) -> Result<Option<TopicId>, StorageError> {
        let sql = format!("SELECT id FROM topics WHERE {} = ?1", key_column(key));
        let id = self
            .conn
            .query_row(&sql, params![key.as_str()], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(id.map(TopicId::from_raw))
    }

    fn insert_topic(&mut self, key: &TopicKey) -> Result<Option<TopicId>, StorageError> {
        let sql = format!(
            "INSERT INTO topics ({}) VALUES (?1) ON CONFLICT DO NOTHING",
            key_column(key)
        );
        let changes = self.conn.execute(&sql, params![key.as_str()])?;
        if changes == 0 {
            return Ok(None);
        }
        Ok(Some(TopicId::from_raw(self.conn.last_insert_rowid())))
    }

    fn insert_topic_pair(&mut self, mid: &str, textid: &str) -> Result<WriteOutcome, StorageError> {
        if let Some(reason) = length_check(textid, MAX_VARCHAR_SIZE) {
            return Ok(WriteOutcome::Rejected(reason));
        }
        let changes = self.conn.execute(
            "INSERT INTO topics (mid, textid) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            params![mid, textid],
        )?;
        if changes > 0 {
            return Ok(WriteOutcome::Inserted);
        }
        // An earlier main pass may have created a half-identified row.
        let mut filled = self.conn.execute(
            "UPDATE topics SET textid = ?2
             WHERE mid = ?1 AND textid IS NULL
               AND NOT EXISTS (SELECT 1 FROM topics WHERE textid = ?2)",
            params![mid, textid],
        )?;
        if filled == 0 {
            filled = self.conn.execute(
                "UPDATE topics SET mid = ?1
                 WHERE textid = ?2 AND mid IS NULL
                   AND NOT EXISTS (SELECT 1 FROM topics WHERE mid = ?1)",
                params![mid, textid],
            )?;
        }
        Ok(if filled > 0 {
            WriteOutcome::Updated
        } else {
            WriteOutcome::AlreadyExists
        })
    }

    fn insert_language_value(
        &mut self,
        facet: LanguageFacet,
        topic_id: TopicId,
        language: &str,
        value: &str,
    ) -> Result<WriteOutcome, StorageError> {
        if language.chars().count() > MAX_LANGUAGE_SIZE {
            return Ok(WriteOutcome::Rejected(RejectReason::LanguageTooLong(
                language.to_string(),
            )));
        }
        if let Some(reason) = facet.max_len().and_then(|max| length_check(value, max)) {
            return Ok(WriteOutcome::Rejected(reason));
        }
        let sql = format!(
            "INSERT INTO {} (topic_id, language, value) VALUES (?1, ?2, ?3) ON CONFLICT DO NOTHING",
            facet.table()
        );
        let changes = self
            .conn
            .execute(&sql, params![topic_id.as_raw(), language, value])?;
        Ok(inserted(changes))
    }

    fn insert_type(
        &mut self,
        topic_id: TopicId,
        type_id: TopicId,
        notable: bool,
    ) -> Result<WriteOutcome, StorageError> {
        let changes = self.conn.execute(
            "INSERT INTO types (topic_id, type_id, notable) VALUES (?1, ?2, ?3) ON CONFLICT DO NOTHING",
            params![topic_id.as_raw(), type_id.as_raw(), notable],
        )?;
        Ok(inserted(changes))
    }

    fn promote_notable(
        &mut self,
        topic_id: TopicId,
        type_id: TopicId,
    ) -> Result<WriteOutcome, StorageError> {
        let changes = self.conn.execute(
            "UPDATE types SET notable = 1 WHERE topic_id = ?1 AND type_id = ?2 AND notable = 0",
            params![topic_id.as_raw(), type_id.as_raw()],
        )?;
        Ok(if changes > 0 {
            WriteOutcome::Updated
        } else {
            WriteOutcome::AlreadyExists
        })
    }

    fn insert_key(&mut self, topic_id: TopicId, key: &str) -> Result<WriteOutcome, StorageError> {
        if let Some(reason) = length_check(key, MAX_VARCHAR_SIZE) {
            return Ok(WriteOutcome::Rejected(reason));
        }
        let changes = self.conn.execute(
            "INSERT INTO keys (topic_id, key) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            params![topic_id.as_raw(), key],
        )?;
        Ok(inserted(changes))
    }

    fn upsert_property_field(
        &mut self,
        topic_id: TopicId,
        field: PropertyField,
        value: TopicId,
    ) -> Result<WriteOutcome, StorageError> {
        let column = field.column();
        let current: Option<Option<i64>> = self
            .conn
            .query_row(
                &format!("SELECT {column} FROM properties WHERE topic_id = ?1"),
                params![topic_id.as_raw()],
                |row| row.get(0),
            )
            .optional()?;
        match current {
            None => {
                self.conn.execute(
                    &format!("INSERT INTO properties (topic_id, {column}) VALUES (?1, ?2)"),
                    params![topic_id.as_raw(), value.as_raw()],
                )?;
                Ok(WriteOutcome::Inserted)
            }
            Some(Some(existing)) if existing == value.as_raw() => Ok(WriteOutcome::AlreadyExists),
            Some(_) => {
                self.conn.execute(
                    &format!("UPDATE properties SET {column} = ?2 WHERE topic_id = ?1"),
                    params![topic_id.as_raw(), value.as_raw()],
                )?;
                Ok(WriteOutcome::Updated)
            }
        }
    }

    fn upsert_property_unique(
        &mut self,
        topic_id: TopicId,
        unique: bool,
    ) -> Result<WriteOutcome, StorageError> {
        let current: Option<Option<bool>> = self
            .conn
            .query_row(
                "SELECT is_unique FROM properties WHERE topic_id = ?1",
                params![topic_id.as_raw()],
                |row| row.get(0),
            )
            .optional()?;
        match current {
            None => {
                self.conn.execute(
                    "INSERT INTO properties (topic_id, is_unique) VALUES (?1, ?2)",
                    params![topic_id.as_raw(), unique],
                )?;
                Ok(WriteOutcome::Inserted)
            }
            Some(Some(existing)) if existing == unique => Ok(WriteOutcome::AlreadyExists),
            Some(_) => {
                self.conn.execute(
                    "UPDATE properties SET is_unique = ?2 WHERE topic_id = ?1",
                    params![topic_id.as_raw(), unique],
                )?;
                Ok(WriteOutcome::Updated)
            }
        }
    }

    fn topic(&self, id: TopicId) -> Result<Option<TopicRecord>, StorageError> {
        self.topic_where("id", &id.as_raw())
    }

    fn topic_by_mid(&self, mid: &str) -> Result<Option<TopicRecord>, StorageError> {
        self.topic_where("mid", &mid)
    }

    fn topic_by_textid(&self, textid: &str) -> Result<Option<TopicRecord>, StorageError> {
        self.topic_where("textid", &textid)
    }

    fn topics_by_key(&self, key: &str) -> Result<Vec<TopicRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.mid, t.textid FROM topics t JOIN keys k ON k.topic_id = t.id
             WHERE k.key = ?1 ORDER BY t.id",
        )?;
        let topics = stmt
            .query_map(params![key], read_topic)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(topics)
    }

    fn language_values(
        &self,
        facet: LanguageFacet,
        topic_id: TopicId,
    ) -> Result<Vec<LanguageValue>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT topic_id, language, value FROM {} WHERE topic_id = ?1 ORDER BY language, value",
            facet.table()
        ))?;
        let values = stmt
            .query_map(params![topic_id.as_raw()], |row| {
                Ok(LanguageValue {
                    topic_id: TopicId::from_raw(row.get(0)?),
                    language: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn types(&self, topic_id: TopicId) -> Result<Vec<TypeAssertion>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT topic_id, type_id, notable FROM types WHERE topic_id = ?1 ORDER BY type_id",
        )?;
        let types = stmt
            .query_map(params![topic_id.as_raw()], |row| {
                Ok(TypeAssertion {
                    topic_id: TopicId::from_raw(row.get(0)?),
                    type_id: TopicId::from_raw(row.get(1)?),
                    notable: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(types)
    }

    fn keys(&self, topic_id: TopicId) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM keys WHERE topic_id = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map(params![topic_id.as_raw()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn property(&self, topic_id: TopicId) -> Result<Option<PropertyRecord>, StorageError> {
        let record = self
            .conn
            .query_row(
                "SELECT topic_id, schema_id, expected_type_id, is_unique, master_id, reverse_id, unit_id, delegated_id
                 FROM properties WHERE topic_id = ?1",
                params![topic_id.as_raw()],
                |row| {
                    Ok(PropertyRecord {
                        topic_id: TopicId::from_raw(row.get(0)?),
                        schema_id: opt_id(row.get(1)?),
                        expected_type_id: opt_id(row.get(2)?),
                        unique: row.get(3)?,
                        master_id: opt_id(row.get(4)?),
                        reverse_id: opt_id(row.get(5)?),
                        unit_id: opt_id(row.get(6)?),
                        delegated_id: opt_id(row.get(7)?),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn counts(&self) -> Result<TableCounts, StorageError> {
        let count = |table: &str| -> Result<u64, StorageError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as u64)
        };
        Ok(TableCounts {
            topics: count("topics")?,
            labels: count("labels")?,
            descriptions: count("descriptions")?,
            aliases: count("aliases")?,
            types: count("types")?,
            keys: count("keys")?,
            properties: count("properties")?,
        })
    }

    fn references_to(&self, topic_id: TopicId) -> Result<u64, StorageError> {
        let mut total = 0;
        for table in ["labels", "descriptions", "aliases", "keys"] {
            total += self.count(
                &format!("SELECT COUNT(*) FROM {table} WHERE topic_id = ?1"),
                topic_id,
            )?;
        }
        total += self.count(
            "SELECT COUNT(*) FROM types WHERE topic_id = ?1 OR type_id = ?1",
            topic_id,
        )?;
        let property_refs = PropertyField::ALL
            .iter()
            .map(|field| format!("{} = ?1", field.column()))
            .collect::<Vec<_>>()
            .join(" OR ");
        total += self.count(
            &format!("SELECT COUNT(*) FROM properties WHERE topic_id = ?1 OR {property_refs}"),
            topic_id,
        )?;
        Ok(total)
    }

    fn find_duplicate_pairs(&self) -> Result<Vec<DuplicatePair>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT k.topic_id, t.id, t.textid FROM keys k JOIN topics t ON t.textid = k.key
             WHERE k.topic_id != t.id ORDER BY k.topic_id, t.id",
        )?;
        let pairs = stmt
            .query_map([], |row| {
                Ok(DuplicatePair {
                    from_id: TopicId::from_raw(row.get(0)?),
                    to_id: TopicId::from_raw(row.get(1)?),
                    textid: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    fn merge_topics(&mut self, pair: &DuplicatePair) -> Result<Option<MergeStats>, StorageError> {
        let from = pair.from_id.as_raw();
        let to = pair.to_id.as_raw();
        let tx = self.conn.transaction()?;

        let alive: i64 = tx.query_row(
            "SELECT COUNT(*) FROM topics WHERE id IN (?1, ?2)",
            params![from, to],
            |row| row.get(0),
        )?;
        if from == to || alive != 2 {
            return Ok(None);
        }

        let mut stats = MergeStats::default();

        // Type assertions owned by `from`: carry notability over, then move.
        tx.execute(
            "UPDATE types SET notable = 1
             WHERE topic_id = ?2 AND notable = 0
               AND type_id IN (SELECT type_id FROM types WHERE topic_id = ?1 AND notable = 1)",
            params![from, to],
        )?;
        stats.repointed += tx.execute(
            "UPDATE OR IGNORE types SET topic_id = ?2 WHERE topic_id = ?1",
            params![from, to],
        )? as u64;
        stats.dropped += tx.execute("DELETE FROM types WHERE topic_id = ?1", params![from])? as u64;

        // Type assertions using `from` as the type.
        tx.execute(
            "UPDATE types SET notable = 1
             WHERE type_id = ?2 AND notable = 0
               AND topic_id IN (SELECT topic_id FROM types WHERE type_id = ?1 AND notable = 1)",
            params![from, to],
        )?;
        stats.repointed += tx.execute(
            "UPDATE OR IGNORE types SET type_id = ?2 WHERE type_id = ?1",
            params![from, to],
        )? as u64;
        stats.dropped += tx.execute("DELETE FROM types WHERE type_id = ?1", params![from])? as u64;

        for table in ["labels", "descriptions", "aliases", "keys"] {
            stats.repointed += tx.execute(
                &format!("UPDATE OR IGNORE {table} SET topic_id = ?2 WHERE topic_id = ?1"),
                params![from, to],
            )? as u64;
            stats.dropped += tx.execute(
                &format!("DELETE FROM {table} WHERE topic_id = ?1"),
                params![from],
            )? as u64;
        }

        // Property metadata: fill the survivor's gaps, move, then repoint references.
        let fill = std::iter::once("is_unique")
            .chain(PropertyField::ALL.iter().map(|field| field.column()))
            .map(|column| {
                format!(
                    "{column} = COALESCE({column}, (SELECT {column} FROM properties WHERE topic_id = ?1))"
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute(
            &format!("UPDATE properties SET {fill} WHERE topic_id = ?2"),
            params![from, to],
        )?;
        stats.repointed += tx.execute(
            "UPDATE OR IGNORE properties SET topic_id = ?2 WHERE topic_id = ?1",
            params![from, to],
        )? as u64;
        stats.dropped += tx.execute(
            "DELETE FROM properties WHERE topic_id = ?1",
            params![from],
        )? as u64;
        for field in PropertyField::ALL {
            let column = field.column();
            stats.repointed += tx.execute(
                &format!("UPDATE properties SET {column} = ?2 WHERE {column} = ?1"),
                params![from, to],
            )? as u64;
        }

        // The survivor keeps its own identifiers and inherits the ones it lacks.
        let from_mid: Option<String> =
            tx.query_row("SELECT mid FROM topics WHERE id = ?1", params![from], |row| {
                row.get(0)
            })?;
        tx.execute("DELETE FROM topics WHERE id = ?1", params![from])?;
        tx.execute(
            "UPDATE topics SET textid = COALESCE(textid, ?2), mid = COALESCE(mid, ?3)
             WHERE id = ?1",
            params![to, pair.textid, from_mid],
        )?;

        tx.commit()?;
        Ok(Some(stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mid(s: &str) -> TopicKey {
        TopicKey::Mid(s.into())
    }

    fn textid(s: &str) -> TopicKey {
        TopicKey::TextId(s.into())
    }

    fn create(store: &mut SqliteStore, key: TopicKey) -> Result<TopicId, StorageError> {
        Ok(store.insert_topic(&key)?.expect("key is fresh"))
    }

    #[test]
    fn insert_topic_reports_conflicts() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let id = create(&mut store, mid("/m/02mjmr"))?;
        assert_eq!(store.insert_topic(&mid("/m/02mjmr"))?, None);
        assert_eq!(store.find_topic(&mid("/m/02mjmr"))?, Some(id));
        assert_eq!(store.find_topic(&textid("/m/02mjmr"))?, None);
        Ok(())
    }

    #[test]
    fn reconnect_keeps_file_backed_state() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let descriptor = StoreDescriptor::File(dir.path().join("freebase.db"));
        let mut store = SqliteStore::open(descriptor.clone())?;
        let id = create(&mut store, textid("/en/x"))?;

        store.reconnect()?;
        assert_eq!(store.find_topic(&textid("/en/x"))?, Some(id));

        let reopened = SqliteStore::open(descriptor)?;
        assert_eq!(reopened.topic_by_textid("/en/x")?.map(|t| t.id), Some(id));
        Ok(())
    }

    #[test]
    fn topic_pair_fills_missing_mid() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let id = create(&mut store, textid("/en/barack_obama"))?;
        assert_eq!(
            store.insert_topic_pair("/m/02mjmr", "/en/barack_obama")?,
            WriteOutcome::Updated
        );
        assert_eq!(store.topic_by_mid("/m/02mjmr")?.map(|t| t.id), Some(id));
        Ok(())
    }

    #[test]
    fn topic_pair_fills_missing_textid() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let id = create(&mut store, mid("/m/02mjmr"))?;
        assert_eq!(
            store.insert_topic_pair("/m/02mjmr", "/en/barack_obama")?,
            WriteOutcome::Updated
        );
        assert_eq!(
            store.insert_topic_pair("/m/02mjmr", "/en/barack_obama")?,
            WriteOutcome::AlreadyExists
        );
        let topic = store.topic(id)?.unwrap();
        assert_eq!(topic.textid.as_deref(), Some("/en/barack_obama"));
        Ok(())
    }

    #[test]
    fn language_values_are_bounded_and_deduplicated() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let id = create(&mut store, mid("/m/01"))?;

        let label = LanguageFacet::Label;
        assert_eq!(store.insert_language_value(label, id, "en", "A")?, WriteOutcome::Inserted);
        assert_eq!(
            store.insert_language_value(label, id, "en", "B")?,
            WriteOutcome::AlreadyExists
        );
        let long = "x".repeat(MAX_VARCHAR_SIZE);
        assert!(matches!(
            store.insert_language_value(label, id, "fr", &long)?,
            WriteOutcome::Rejected(RejectReason::ValueTooLong { .. })
        ));
        assert!(matches!(
            store.insert_language_value(label, id, "en-gb-oed", "A")?,
            WriteOutcome::Rejected(RejectReason::LanguageTooLong(_))
        ));
        assert_eq!(
            store.insert_language_value(LanguageFacet::Description, id, "en", &long)?,
            WriteOutcome::Inserted
        );

        let alias = LanguageFacet::Alias;
        assert_eq!(store.insert_language_value(alias, id, "en", "A")?, WriteOutcome::Inserted);
        assert_eq!(store.insert_language_value(alias, id, "en", "B")?, WriteOutcome::Inserted);
        assert_eq!(store.aliases(id)?.len(), 2);
        assert_eq!(store.labels(id)?[0].value, "A");
        Ok(())
    }

    #[test]
    fn facet_rows_require_an_existing_topic() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let result = store.insert_key(TopicId::from_raw(42), "/user/x");
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn notability_only_goes_up() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let topic = create(&mut store, mid("/m/01"))?;
        let ty = create(&mut store, textid("/people/person"))?;

        assert_eq!(store.insert_type(topic, ty, false)?, WriteOutcome::Inserted);
        assert_eq!(store.promote_notable(topic, ty)?, WriteOutcome::Updated);
        assert_eq!(store.promote_notable(topic, ty)?, WriteOutcome::AlreadyExists);
        assert_eq!(store.insert_type(topic, ty, false)?, WriteOutcome::AlreadyExists);
        assert!(store.types(topic)?[0].notable);
        Ok(())
    }

    #[test]
    fn property_fields_upsert_independently() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let prop = create(&mut store, textid("/people/person/spouse"))?;
        let schema = create(&mut store, textid("/people/person"))?;
        let expected = create(&mut store, textid("/people/marriage"))?;

        assert_eq!(
            store.upsert_property_field(prop, PropertyField::Schema, schema)?,
            WriteOutcome::Inserted
        );
        assert_eq!(
            store.upsert_property_field(prop, PropertyField::ExpectedType, expected)?,
            WriteOutcome::Updated
        );
        assert_eq!(store.upsert_property_unique(prop, false)?, WriteOutcome::Updated);
        assert_eq!(
            store.upsert_property_field(prop, PropertyField::Schema, schema)?,
            WriteOutcome::AlreadyExists
        );
        assert_eq!(store.upsert_property_unique(prop, false)?, WriteOutcome::AlreadyExists);

        let record = store.property(prop)?.unwrap();
        assert_eq!(record.schema_id, Some(schema));
        assert_eq!(record.expected_type_id, Some(expected));
        assert_eq!(record.unique, Some(false));
        assert_eq!(record.master_id, None);
        Ok(())
    }

    #[test]
    fn merge_moves_facets_and_deletes_source() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let a = create(&mut store, mid("/m/0a"))?;
        let b = create(&mut store, textid("/en/x"))?;
        let t = create(&mut store, textid("/common/topic"))?;

        store.insert_key(a, "/en/x")?;
        store.insert_type(a, t, true)?;
        store.insert_type(b, t, false)?;
        store.insert_language_value(LanguageFacet::Label, a, "en", "X from A")?;
        store.insert_language_value(LanguageFacet::Label, b, "en", "X from B")?;
        store.insert_language_value(LanguageFacet::Alias, a, "en", "Ex")?;

        let pairs = store.find_duplicate_pairs()?;
        assert_eq!(
            pairs,
            vec![DuplicatePair {
                from_id: a,
                to_id: b,
                textid: "/en/x".into()
            }]
        );

        let stats = store.merge_topics(&pairs[0])?.unwrap();
        assert!(stats.repointed >= 2);
        assert!(stats.dropped >= 2);

        assert_eq!(store.topic(a)?, None);
        assert_eq!(store.references_to(a)?, 0);
        assert_eq!(store.labels(b)?[0].value, "X from B");
        assert_eq!(store.aliases(b)?[0].value, "Ex");
        assert_eq!(
            store.types(b)?,
            vec![TypeAssertion {
                topic_id: b,
                type_id: t,
                notable: true
            }]
        );
        assert!(store.find_duplicate_pairs()?.is_empty());
        assert_eq!(store.merge_topics(&pairs[0])?, None);
        Ok(())
    }

    #[test]
    fn merged_topic_stays_reachable_by_mid() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let a = create(&mut store, mid("/m/0a"))?;
        let b = create(&mut store, textid("/en/x"))?;
        store.insert_key(a, "/en/x")?;

        let pair = store.find_duplicate_pairs()?.remove(0);
        store.merge_topics(&pair)?;

        let survivor = store.topic_by_mid("/m/0a")?.unwrap();
        assert_eq!(survivor.id, b);
        assert_eq!(survivor.textid.as_deref(), Some("/en/x"));
        Ok(())
    }

    #[test]
    fn merge_repoints_type_and_property_references() -> Result<(), StorageError> {
        let mut store = SqliteStore::open_in_memory()?;
        let from = create(&mut store, mid("/m/0from"))?;
        let to = create(&mut store, textid("/film/film"))?;
        let film = create(&mut store, mid("/m/0film"))?;
        let prop = create(&mut store, textid("/film/film/directed_by"))?;

        store.insert_key(from, "/film/film")?;
        store.insert_type(film, from, true)?;
        store.upsert_property_field(prop, PropertyField::Schema, from)?;
        store.upsert_property_unique(from, true)?;
        store.upsert_property_field(to, PropertyField::Unit, film)?;

        let pair = store.find_duplicate_pairs()?.remove(0);
        store.merge_topics(&pair)?;

        assert_eq!(store.types(film)?[0].type_id, to);
        assert!(store.types(film)?[0].notable);
        assert_eq!(store.property(prop)?.unwrap().schema_id, Some(to));
        let folded = store.property(to)?.unwrap();
        assert_eq!(folded.unique, Some(true));
        assert_eq!(folded.unit_id, Some(film));
        assert_eq!(store.references_to(from)?, 0);
        Ok(())
    }
}
