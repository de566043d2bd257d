use freebase_engine::{EngineError, IngestOptions};
use freebase_harness::{DumpBuilder, TestLoader};
use freebase_storage::Store;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn identity() -> DumpBuilder {
    DumpBuilder::new()
        .iri("m.02mjmr", "type.object.id", "en.barack_obama")
        .iri("m.025s5v9", "type.object.id", "en.michelle_obama")
}

fn dump() -> DumpBuilder {
    DumpBuilder::new()
        .text("m.02mjmr", "type.object.name", "Barack Obama", "en")
        .iri("m.02mjmr", "type.object.type", "people.person")
        .raw("broken line")
        .text("m.025s5v9", "type.object.name", "Michelle Obama", "en")
        .iri("m.025s5v9", "type.object.type", "people.person")
        .iri("m.025s5v9", "common.topic.notable_types", "people.person")
        .literal("m.025s5v9", "type.object.key", "/wikipedia/en/Michelle_Obama")
        .text("m.0gx2k1", "common.topic.alias", "Sasha", "en")
        .iri("m.0gx2k1", "type.object.type", "people.person")
}

#[test]
fn interrupted_run_matches_uninterrupted_run() -> TestResult {
    let reference = TestLoader::new()?;
    reference.load(&identity(), &dump(), IngestOptions::default())?;

    for stop_at in [1, 2, 5, 8] {
        let loader = TestLoader::new()?;
        let first = loader.load(
            &identity(),
            &dump(),
            IngestOptions {
                limit: Some(stop_at),
                ..IngestOptions::default()
            },
        )?;
        assert_eq!(first.checkpoint, Some(stop_at));
        assert_eq!(std::fs::read_to_string(loader.checkpoint_path())?, stop_at.to_string());

        let second = loader.load(&identity(), &dump(), IngestOptions::default())?;
        assert_eq!(second.resumed_from, stop_at);
        assert_eq!(second.checkpoint, Some(dump().len() as u64));
        assert_eq!(loader.snapshot()?, reference.snapshot()?, "stopped at {stop_at}");
    }
    Ok(())
}

#[test]
fn periodic_checkpoints_bound_replay() -> TestResult {
    let loader = TestLoader::new()?;
    let stats = loader.load(
        &identity(),
        &dump(),
        IngestOptions {
            checkpoint_every: 2,
            limit: Some(7),
            ..IngestOptions::default()
        },
    )?;
    assert_eq!(stats.main.lines, 7);
    assert_eq!(stats.checkpoint, Some(7));

    // Replaying from an older checkpoint only repeats idempotent writes.
    std::fs::write(loader.checkpoint_path(), "4")?;
    let before = loader.snapshot()?;
    let replay = loader.load(
        &identity(),
        &dump(),
        IngestOptions {
            limit: Some(3),
            ..IngestOptions::default()
        },
    )?;
    assert_eq!(replay.main.inserted, 0);
    assert_eq!(loader.snapshot()?, before);
    Ok(())
}

#[test]
fn finished_dump_resumes_to_nothing() -> TestResult {
    let loader = TestLoader::new()?;
    loader.load(&identity(), &dump(), IngestOptions::default())?;
    let again = loader.load(&identity(), &dump(), IngestOptions::default())?;
    assert_eq!(again.main.triples, 0);
    assert_eq!(again.resumed_from, dump().len() as u64);
    Ok(())
}

#[test]
fn malformed_checkpoint_is_fatal() -> TestResult {
    let loader = TestLoader::new()?;
    std::fs::write(loader.checkpoint_path(), "three million")?;
    let err = loader
        .load(&identity(), &dump(), IngestOptions::default())
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::Checkpoint(_))
    ));
    assert_eq!(loader.store().counts()?.topics, 0);
    Ok(())
}
