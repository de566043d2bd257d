use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use freebase_cli::{DatabaseArgs, init_logging};
use freebase_engine::checkpoint::DEFAULT_CHECKPOINT_FILE;
use freebase_engine::pipeline::DEFAULT_CHECKPOINT_EVERY;
use freebase_engine::resolver::DEFAULT_CACHE_CAPACITY;
use freebase_engine::{FileCheckpoint, IngestOptions, Ingestor, open_dump};
use freebase_storage::SqliteStore;

/// Load a Freebase N-Triples dump into the relational store.
#[derive(Parser, Debug)]
#[command(name = "freebase-load")]
struct Cli {
    /// Full dump (`.gz`, `.zst` or plain N-Triples).
    dump: PathBuf,

    /// Dump restricted to `type.object.id`, applied first.
    mid_textid_dump: PathBuf,

    #[command(flatten)]
    database: DatabaseArgs,

    /// Progress sidecar holding the number of main-dump lines applied.
    #[arg(long, default_value = DEFAULT_CHECKPOINT_FILE)]
    checkpoint: PathBuf,

    #[arg(long, default_value_t = DEFAULT_CHECKPOINT_EVERY)]
    checkpoint_every: u64,

    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    cache_capacity: usize,

    /// Stop after this many main-dump lines.
    #[arg(long)]
    limit: Option<u64>,

    /// Print the final statistics as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let descriptor = cli.database.descriptor()?;
    info!(%descriptor, "opening store");
    let store = SqliteStore::open(descriptor)?;
    let options = IngestOptions {
        checkpoint_every: cli.checkpoint_every,
        cache_capacity: cli.cache_capacity,
        limit: cli.limit,
    };
    let mut ingestor = Ingestor::new(store, FileCheckpoint::new(&cli.checkpoint), options);

    let identity = open_dump(&cli.mid_textid_dump)
        .with_context(|| format!("opening {}", cli.mid_textid_dump.display()))?;
    let dump = open_dump(&cli.dump).with_context(|| format!("opening {}", cli.dump.display()))?;
    let stats = ingestor.run(identity, dump)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        info!(
            lines = stats.main.lines,
            inserted = stats.identity.inserted + stats.main.inserted,
            updated = stats.identity.updated + stats.main.updated,
            rejected = stats.main.rejected,
            failed = stats.main.failed,
            "load complete"
        );
    }
    Ok(())
}
