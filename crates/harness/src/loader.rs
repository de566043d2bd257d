use std::collections::BTreeMap;
use std::path::PathBuf;

use tempfile::TempDir;

use freebase_engine::{
    FileCheckpoint, IngestOptions, IngestStats, Ingestor, MergeReport, Reconciler, open_dump,
};
use freebase_storage::schema::FACET_TABLES;
use freebase_storage::{SqliteStore, StorageError, StoreDescriptor};

use crate::DumpBuilder;

/// Every row of every table, rendered as text and sorted per table.
pub type Snapshot = BTreeMap<String, Vec<String>>;

/// A scratch directory holding a database file, a checkpoint sidecar and
/// the gzip dumps, driven the way the loader binary drives them.
pub struct TestLoader {
    dir: TempDir,
    descriptor: StoreDescriptor,
    store: SqliteStore,
}

impl TestLoader {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let descriptor = StoreDescriptor::File(dir.path().join("freebase.db"));
        let store = SqliteStore::open(descriptor.clone())?;
        Ok(Self {
            dir,
            descriptor,
            store,
        })
    }

    /// Read connection to the database.
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.path().join("progress.txt")
    }

    pub fn reset_checkpoint(&self) -> std::io::Result<()> {
        match std::fs::remove_file(self.checkpoint_path()) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }

    /// Run both passes over fresh gzip copies of the dumps.
    pub fn load(
        &self,
        identity: &DumpBuilder,
        dump: &DumpBuilder,
        options: IngestOptions,
    ) -> Result<IngestStats, Box<dyn std::error::Error>> {
        let identity_path = self.dir.path().join("mid_textid.nt.gz");
        let dump_path = self.dir.path().join("dump.nt.gz");
        identity.write_gz(&identity_path)?;
        dump.write_gz(&dump_path)?;

        let store = SqliteStore::open(self.descriptor.clone())?;
        let checkpoint = FileCheckpoint::new(self.checkpoint_path());
        let mut ingestor = Ingestor::new(store, checkpoint, options);
        let stats = ingestor.run(open_dump(&identity_path)?, open_dump(&dump_path)?)?;
        Ok(stats)
    }

    pub fn merge(&self) -> Result<MergeReport, StorageError> {
        let mut store = SqliteStore::open(self.descriptor.clone())?;
        Reconciler::new(&mut store).run()
    }

    pub fn snapshot(&self) -> Result<Snapshot, StorageError> {
        let conn = self.store.conn();
        let mut snapshot = Snapshot::new();
        for table in std::iter::once("topics").chain(FACET_TABLES) {
            let mut stmt = conn.prepare(&format!("SELECT * FROM {table}"))?;
            let columns = stmt.column_count();
            let mut rows = stmt
                .query_map([], |row| {
                    let values = (0..columns)
                        .map(|i| row.get_ref(i).map(|value| format!("{value:?}")))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(values.join("|"))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.sort();
            snapshot.insert(table.to_string(), rows);
        }
        Ok(snapshot)
    }
}
