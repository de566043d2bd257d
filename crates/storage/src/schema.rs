use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA mmap_size = 268435456;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Tables holding a `topic_id` column, in the order the merge repoints them.
pub const FACET_TABLES: [&str; 6] = [
    "labels",
    "descriptions",
    "aliases",
    "types",
    "keys",
    "properties",
];

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS topics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mid TEXT UNIQUE CHECK (mid IS NULL OR length(mid) <= 13),
    textid TEXT UNIQUE CHECK (textid IS NULL OR length(textid) < 191),
    CHECK (mid IS NOT NULL OR textid IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS labels (
    topic_id INTEGER NOT NULL REFERENCES topics (id),
    language TEXT NOT NULL CHECK (length(language) <= 5),
    value TEXT NOT NULL CHECK (length(value) < 191),
    PRIMARY KEY (topic_id, language)
);

CREATE TABLE IF NOT EXISTS descriptions (
    topic_id INTEGER NOT NULL REFERENCES topics (id),
    language TEXT NOT NULL CHECK (length(language) <= 5),
    value TEXT NOT NULL,
    PRIMARY KEY (topic_id, language)
);

CREATE TABLE IF NOT EXISTS aliases (
    topic_id INTEGER NOT NULL REFERENCES topics (id),
    language TEXT NOT NULL CHECK (length(language) <= 5),
    value TEXT NOT NULL CHECK (length(value) < 191),
    PRIMARY KEY (topic_id, language, value)
);

CREATE TABLE IF NOT EXISTS types (
    topic_id INTEGER NOT NULL REFERENCES topics (id),
    type_id INTEGER NOT NULL REFERENCES topics (id),
    notable INTEGER NOT NULL CHECK (notable IN (0, 1)),
    PRIMARY KEY (topic_id, type_id)
);
CREATE INDEX IF NOT EXISTS idx_types_type ON types (type_id);

CREATE TABLE IF NOT EXISTS keys (
    topic_id INTEGER NOT NULL REFERENCES topics (id),
    key TEXT NOT NULL CHECK (length(key) < 191),
    PRIMARY KEY (topic_id, key)
);
CREATE INDEX IF NOT EXISTS idx_keys_key ON keys (key);

CREATE TABLE IF NOT EXISTS properties (
    topic_id INTEGER PRIMARY KEY REFERENCES topics (id),
    schema_id INTEGER REFERENCES topics (id),
    expected_type_id INTEGER REFERENCES topics (id),
    is_unique INTEGER CHECK (is_unique IS NULL OR is_unique IN (0, 1)),
    master_id INTEGER REFERENCES topics (id),
    reverse_id INTEGER REFERENCES topics (id),
    unit_id INTEGER REFERENCES topics (id),
    delegated_id INTEGER REFERENCES topics (id)
);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_reentrant() -> Result<(), StorageError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        init_schema(&conn)?;
        let version: i32 =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
        assert_eq!(version, SCHEMA_VERSION);
        Ok(())
    }

    #[test]
    fn topic_needs_an_identifier() -> Result<(), StorageError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        let result = conn.execute("INSERT INTO topics (mid, textid) VALUES (NULL, NULL)", []);
        assert!(result.is_err());
        Ok(())
    }
}
