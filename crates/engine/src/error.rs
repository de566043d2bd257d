use freebase_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid checkpoint: {0}")]
    Checkpoint(String),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_transient())
    }
}
