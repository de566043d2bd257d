use std::path::Path;

use anyhow::{Context, bail};
use clap::Args;
use tracing_subscriber::EnvFilter;

use freebase_storage::StoreDescriptor;

pub const DATABASE_URL_FILE: &str = "database_url.txt";

const DEFAULT_LOG_FILTER: &str = "freebase_engine=info,freebase_storage=info,freebase_cli=info";

/// Log to stderr so `--json` output on stdout stays clean. `RUST_LOG`
/// overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Store descriptor, e.g. `sqlite:///freebase.db`. Falls back to the
    /// first line of `database_url.txt` in the working directory.
    #[arg(long, env = "FREEBASE_DATABASE_URL")]
    pub database: Option<String>,
}

impl DatabaseArgs {
    pub fn descriptor(&self) -> anyhow::Result<StoreDescriptor> {
        resolve_descriptor(self.database.as_deref(), Path::new("."))
    }
}

/// Explicit descriptor if given, otherwise `dir/database_url.txt`.
pub fn resolve_descriptor(explicit: Option<&str>, dir: &Path) -> anyhow::Result<StoreDescriptor> {
    if let Some(descriptor) = explicit {
        return Ok(descriptor.parse()?);
    }
    let path = dir.join(DATABASE_URL_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => bail!(
            "no database configured: pass --database, set FREEBASE_DATABASE_URL or create {}",
            path.display()
        ),
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };
    let line = contents.lines().next().unwrap_or_default();
    line.parse::<StoreDescriptor>()
        .with_context(|| format!("invalid descriptor in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn explicit_descriptor_wins() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(DATABASE_URL_FILE), "sqlite:///other.db\n")?;
        let descriptor = resolve_descriptor(Some(":memory:"), dir.path())?;
        assert_eq!(descriptor, StoreDescriptor::Memory);
        Ok(())
    }

    #[test]
    fn falls_back_to_first_line_of_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join(DATABASE_URL_FILE),
            "sqlite:///freebase.db\nignored\n",
        )?;
        let descriptor = resolve_descriptor(None, dir.path())?;
        assert_eq!(descriptor, StoreDescriptor::File(PathBuf::from("freebase.db")));
        Ok(())
    }

    #[test]
    fn missing_configuration_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let err = resolve_descriptor(None, dir.path()).unwrap_err();
        assert!(err.to_string().contains("no database configured"));
        Ok(())
    }

    #[test]
    fn bad_descriptor_in_file_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(DATABASE_URL_FILE), "mysql://root@localhost/fb\n")?;
        assert!(resolve_descriptor(None, dir.path()).is_err());
        Ok(())
    }
}
