pub mod checkpoint;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod resolver;
pub mod source;
pub mod writers;

pub use checkpoint::{Checkpoint, FileCheckpoint, MemoryCheckpoint};
pub use dispatch::{Dispatcher, Phase};
pub use error::EngineError;
pub use pipeline::{IngestOptions, IngestStats, Ingestor, PassStats};
pub use reconcile::{MergeReport, Reconciler};
pub use resolver::{CacheStats, TopicResolver};
pub use source::{TripleSource, open_dump};
pub use writers::{FactOutcome, FactWriter, SkipReason};
