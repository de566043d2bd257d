use clap::Parser;
use tracing::info;

use freebase_cli::{DatabaseArgs, init_logging};
use freebase_engine::Reconciler;
use freebase_storage::SqliteStore;

/// Merge topics that the dump split into a mid-only and a textid-only row.
/// Run only after loading has finished.
#[derive(Parser, Debug)]
#[command(name = "freebase-merge")]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    /// Print the merge report as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let descriptor = cli.database.descriptor()?;
    info!(%descriptor, "opening store");
    let mut store = SqliteStore::open(descriptor)?;
    let report = Reconciler::new(&mut store).run()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
