//! Ingestion progress persistence.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

pub const DEFAULT_CHECKPOINT_FILE: &str = "progress.txt";

/// Where the main pass records how many dump lines it has applied.
pub trait Checkpoint {
    fn load(&self) -> Result<Option<u64>, EngineError>;

    fn save(&mut self, ordinal: u64) -> Result<(), EngineError>;
}

/// Sidecar file holding a single decimal integer.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl Default for FileCheckpoint {
    fn default() -> Self {
        Self::new(DEFAULT_CHECKPOINT_FILE)
    }
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Checkpoint for FileCheckpoint {
    fn load(&self) -> Result<Option<u64>, EngineError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let trimmed = contents.trim();
        trimmed.parse::<u64>().map(Some).map_err(|_| {
            EngineError::Checkpoint(format!(
                "{}: expected a line count, found {trimmed:?}",
                self.path.display()
            ))
        })
    }

    fn save(&mut self, ordinal: u64) -> Result<(), EngineError> {
        let staging = self.staging_path();
        fs::write(&staging, ordinal.to_string())?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

/// In-process checkpoint for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpoint {
    ordinal: Option<u64>,
    saves: u64,
}

impl MemoryCheckpoint {
    pub fn at(ordinal: u64) -> Self {
        Self {
            ordinal: Some(ordinal),
            saves: 0,
        }
    }

    /// How many times `save` has been called.
    pub fn saves(&self) -> u64 {
        self.saves
    }
}

impl Checkpoint for MemoryCheckpoint {
    fn load(&self) -> Result<Option<u64>, EngineError> {
        Ok(self.ordinal)
    }

    fn save(&mut self, ordinal: u64) -> Result<(), EngineError> {
        self.ordinal = Some(ordinal);
        self.saves += 1;
        Ok(())
    }
}
