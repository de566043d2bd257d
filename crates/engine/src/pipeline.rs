//! The two-pass ingestion driver.

use std::io::BufRead;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use freebase_core::{PredicateKind, Triple};
use freebase_storage::{StorageError, Store, WriteOutcome};

use crate::checkpoint::Checkpoint;
use crate::dispatch::{Dispatcher, Phase};
use crate::error::EngineError;
use crate::resolver::{CacheStats, DEFAULT_CACHE_CAPACITY, TopicResolver};
use crate::source::TripleSource;
use crate::writers::{FactOutcome, FactWriter};

pub const DEFAULT_CHECKPOINT_EVERY: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Save the checkpoint after this many main-dump lines.
    pub checkpoint_every: u64,
    pub cache_capacity: usize,
    /// Stop the main pass after consuming this many lines in this run.
    pub limit: Option<u64>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            limit: None,
        }
    }
}

/// Counters for one pass over a dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    /// Raw lines consumed, including any skipped on resume.
    pub lines: u64,
    pub triples: u64,
    pub malformed: u64,
    /// Triples whose predicate the pass does not handle.
    pub ignored: u64,
    pub inserted: u64,
    pub already_exists: u64,
    pub updated: u64,
    pub rejected: u64,
    pub skipped: u64,
    pub failed: u64,
    pub retried: u64,
}

impl PassStats {
    fn record(&mut self, outcome: &FactOutcome) {
        match outcome {
            FactOutcome::Stored(WriteOutcome::Inserted) => self.inserted += 1,
            FactOutcome::Stored(WriteOutcome::AlreadyExists) => self.already_exists += 1,
            FactOutcome::Stored(WriteOutcome::Updated) => self.updated += 1,
            FactOutcome::Stored(WriteOutcome::Rejected(_)) => self.rejected += 1,
            FactOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub identity: PassStats,
    pub main: PassStats,
    /// Checkpoint the main pass started from.
    pub resumed_from: u64,
    /// Last ordinal written to the checkpoint.
    pub checkpoint: Option<u64>,
    pub cache: CacheStats,
}

/// Drives the identity pre-pass and the checkpointed main pass against one
/// store. Single writer: nothing else may write to the store meanwhile.
pub struct Ingestor<S, C> {
    store: S,
    checkpoint: C,
    dispatcher: Dispatcher,
    resolver: TopicResolver,
    options: IngestOptions,
    stats: IngestStats,
}

impl<S: Store, C: Checkpoint> Ingestor<S, C> {
    pub fn new(store: S, checkpoint: C, options: IngestOptions) -> Self {
        Self {
            store,
            checkpoint,
            dispatcher: Dispatcher::new(),
            resolver: TopicResolver::new(options.cache_capacity),
            options,
            stats: IngestStats::default(),
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn checkpoint(&self) -> &C {
        &self.checkpoint
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            cache: self.resolver.stats(),
            ..self.stats
        }
    }

    /// Run both passes in order.
    pub fn run<A: BufRead, B: BufRead>(
        &mut self,
        identity: A,
        dump: B,
    ) -> Result<IngestStats, EngineError> {
        // A corrupt checkpoint must stop the run before anything is written.
        self.checkpoint.load()?;
        self.run_identity_pass(identity)?;
        self.run_main_pass(dump)?;
        Ok(self.stats())
    }

    /// Apply every `type.object.id` triple. Always reads the whole stream.
    pub fn run_identity_pass<R: BufRead>(&mut self, reader: R) -> Result<PassStats, EngineError> {
        info!("identity pass started");
        let mut source = TripleSource::new(reader);
        while let Some(item) = source.next() {
            let (ordinal, triple) = item?;
            self.stats.identity.triples += 1;
            match self.dispatcher.dispatch(Phase::Identity, &triple) {
                Some(kind) => self.apply(Phase::Identity, kind, &triple)?,
                None => {
                    self.stats.identity.ignored += 1;
                    info!(ordinal, triple = %triple, "unexpected triple in identity dump");
                }
            }
        }
        self.stats.identity.lines = source.ordinal();
        self.stats.identity.malformed = source.malformed();
        info!(
            lines = self.stats.identity.lines,
            inserted = self.stats.identity.inserted,
            "identity pass finished"
        );
        Ok(self.stats.identity)
    }

    /// Apply the main dump from the stored checkpoint onwards.
    pub fn run_main_pass<R: BufRead>(&mut self, reader: R) -> Result<PassStats, EngineError> {
        let start = self.checkpoint.load()?.unwrap_or(0);
        self.stats.resumed_from = start;
        info!(resume_from = start, "main pass started");

        let mut source = TripleSource::resume(reader, start)?;
        let mut last_saved = start;
        let every = self.options.checkpoint_every.max(1);

        loop {
            if let Some(limit) = self.options.limit {
                if source.ordinal().saturating_sub(start) >= limit {
                    info!(limit, ordinal = source.ordinal(), "line limit reached");
                    break;
                }
            }
            let Some(item) = source.next() else {
                break;
            };
            let (ordinal, triple) = item?;
            self.stats.main.triples += 1;
            match self.dispatcher.dispatch(Phase::Main, &triple) {
                Some(kind) => self.apply(Phase::Main, kind, &triple)?,
                None => self.stats.main.ignored += 1,
            }

            if ordinal.saturating_sub(last_saved) >= every {
                self.save_checkpoint(ordinal)?;
                last_saved = ordinal;
                let cache = self.resolver.stats();
                info!(
                    ordinal,
                    inserted = self.stats.main.inserted,
                    failed = self.stats.main.failed,
                    cache_hits = cache.hits,
                    cache_misses = cache.misses,
                    "progress"
                );
            }
        }

        let end = source.ordinal();
        if end > last_saved {
            self.save_checkpoint(end)?;
        }
        self.stats.main.lines = end;
        self.stats.main.malformed = source.malformed();
        info!(
            lines = end,
            inserted = self.stats.main.inserted,
            rejected = self.stats.main.rejected,
            failed = self.stats.main.failed,
            "main pass finished"
        );
        Ok(self.stats.main)
    }

    /// Drop the resolver cache and hand the store back.
    pub fn into_store(self) -> S {
        self.store
    }

    fn save_checkpoint(&mut self, ordinal: u64) -> Result<(), EngineError> {
        self.checkpoint.save(ordinal)?;
        self.stats.checkpoint = Some(ordinal);
        Ok(())
    }

    fn pass_stats(&mut self, phase: Phase) -> &mut PassStats {
        match phase {
            Phase::Identity => &mut self.stats.identity,
            Phase::Main => &mut self.stats.main,
        }
    }

    /// Write one fact. A transient store failure gets one retry on a fresh
    /// connection and is fatal after that; any other failure costs only
    /// this fact.
    fn apply(
        &mut self,
        phase: Phase,
        kind: PredicateKind,
        triple: &Triple,
    ) -> Result<(), EngineError> {
        let result = match self.write(kind, triple) {
            Err(err) if err.is_transient() => {
                warn!(error = %err, "transient store failure, reconnecting");
                self.pass_stats(phase).retried += 1;
                self.store.reconnect()?;
                match self.write(kind, triple) {
                    Err(err) if err.is_transient() => return Err(err.into()),
                    result => result,
                }
            }
            result => result,
        };

        match result {
            Ok(outcome) => {
                if let FactOutcome::Skipped(reason) = &outcome {
                    debug!(predicate = kind.as_str(), reason = reason.as_str(), "skipped fact");
                }
                self.pass_stats(phase).record(&outcome);
            }
            Err(err) => {
                self.pass_stats(phase).failed += 1;
                error!(triple = %triple, error = %err, "failed to apply fact");
            }
        }
        Ok(())
    }

    fn write(&mut self, kind: PredicateKind, triple: &Triple) -> Result<FactOutcome, StorageError> {
        FactWriter::new(&mut self.store, &mut self.resolver).apply(kind, triple)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use freebase_storage::SqliteStore;

    use super::*;
    use crate::checkpoint::MemoryCheckpoint;

    const IDENTITY: &str = "\
<http://rdf.freebase.com/ns/m.02mjmr>\t<http://rdf.freebase.com/ns/type.object.id>\t<http://rdf.freebase.com/ns/en.barack_obama>\t.
<http://rdf.freebase.com/ns/m.02mjmr>\t<http://rdf.freebase.com/ns/type.object.name>\t\"Barack Obama\"@en\t.
";

    const DUMP: &str = "\
<http://rdf.freebase.com/ns/m.02mjmr>\t<http://rdf.freebase.com/ns/type.object.name>\t\"Barack Obama\"@en\t.
<http://rdf.freebase.com/ns/m.02mjmr>\t<http://rdf.freebase.com/ns/type.object.type>\t<http://rdf.freebase.com/ns/people.person>\t.
garbage
<http://rdf.freebase.com/ns/m.02mjmr>\t<http://rdf.freebase.com/ns/film.actor.film>\t<http://rdf.freebase.com/ns/m.0abc>\t.
<http://rdf.freebase.com/ns/m.02mjmr>\t<http://rdf.freebase.com/ns/common.topic.notable_types>\t<http://rdf.freebase.com/ns/people.person>\t.
";

    type TestIngestor = Ingestor<SqliteStore, MemoryCheckpoint>;

    fn ingestor(options: IngestOptions) -> Result<TestIngestor, EngineError> {
        Ok(Ingestor::new(
            SqliteStore::open_in_memory()?,
            MemoryCheckpoint::default(),
            options,
        ))
    }

    #[test]
    fn identity_pass_ignores_other_predicates() -> Result<(), EngineError> {
        let mut ingestor = ingestor(IngestOptions::default())?;
        let stats = ingestor.run_identity_pass(Cursor::new(IDENTITY))?;
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(ingestor.store().counts()?.labels, 0);
        Ok(())
    }

    #[test]
    fn main_pass_counts_outcomes() -> Result<(), EngineError> {
        let mut ingestor = ingestor(IngestOptions::default())?;
        let stats = ingestor.run(Cursor::new(IDENTITY), Cursor::new(DUMP))?;
        assert_eq!(stats.main.lines, 5);
        assert_eq!(stats.main.triples, 4);
        assert_eq!(stats.main.malformed, 1);
        assert_eq!(stats.main.ignored, 1);
        assert_eq!(stats.main.inserted, 2);
        assert_eq!(stats.main.updated, 1);
        assert_eq!(stats.checkpoint, Some(5));

        let store = ingestor.into_store();
        let obama = store.topic_by_textid("/en/barack_obama")?.unwrap();
        assert_eq!(obama.mid.as_deref(), Some("/m/02mjmr"));
        assert!(store.types(obama.id)?[0].notable);
        Ok(())
    }

    #[test]
    fn extra_predicates_reach_their_writer() -> Result<(), EngineError> {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("http://rdf.freebase.com/ns/film.actor.film", PredicateKind::Type);
        let mut ingestor = ingestor(IngestOptions::default())?.with_dispatcher(dispatcher);
        let stats = ingestor.run(Cursor::new(IDENTITY), Cursor::new(DUMP))?;
        assert_eq!(stats.main.ignored, 0);
        assert_eq!(stats.main.inserted, 3);

        let store = ingestor.into_store();
        let obama = store.topic_by_textid("/en/barack_obama")?.unwrap();
        let film = store.topic_by_mid("/m/0abc")?.unwrap();
        assert!(store.types(obama.id)?.iter().any(|ty| ty.type_id == film.id));
        Ok(())
    }

    #[test]
    fn checkpoint_is_saved_periodically() -> Result<(), EngineError> {
        let mut ingestor = ingestor(IngestOptions {
            checkpoint_every: 2,
            ..IngestOptions::default()
        })?;
        ingestor.run_main_pass(Cursor::new(DUMP))?;
        // Lines 2 and 4, then the end of the stream.
        assert_eq!(ingestor.checkpoint().saves(), 3);
        assert_eq!(ingestor.checkpoint().load()?, Some(5));
        Ok(())
    }

    #[test]
    fn limit_stops_early_and_resume_finishes() -> Result<(), EngineError> {
        let mut first = ingestor(IngestOptions {
            limit: Some(2),
            ..IngestOptions::default()
        })?;
        let stats = first.run_main_pass(Cursor::new(DUMP))?;
        assert_eq!(stats.lines, 2);
        assert_eq!(first.checkpoint().load()?, Some(2));
        assert_eq!(first.store().counts()?.types, 1);

        let checkpoint = first.checkpoint().clone();
        let mut second = Ingestor::new(first.into_store(), checkpoint, IngestOptions::default());
        let stats = second.run_main_pass(Cursor::new(DUMP))?;
        assert_eq!(second.stats().resumed_from, 2);
        assert_eq!(stats.triples, 2);
        assert_eq!(stats.updated, 1);
        assert_eq!(second.checkpoint().load()?, Some(5));
        Ok(())
    }

    #[test]
    fn resuming_at_the_end_is_a_no_op() -> Result<(), EngineError> {
        let mut ingestor = Ingestor::new(
            SqliteStore::open_in_memory()?,
            MemoryCheckpoint::at(5),
            IngestOptions::default(),
        );
        let stats = ingestor.run_main_pass(Cursor::new(DUMP))?;
        assert_eq!(stats.triples, 0);
        assert_eq!(ingestor.checkpoint().saves(), 0);
        assert_eq!(ingestor.store().counts()?.topics, 0);
        Ok(())
    }
}
