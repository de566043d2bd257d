//! Offline merge of topics the dump split in two.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use freebase_core::TopicId;
use freebase_storage::{DuplicatePair, StorageError, Store};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub pairs_found: u64,
    pub merged: u64,
    /// Pairs already joined by an earlier merge of the same run.
    pub skipped: u64,
    pub repointed: u64,
    pub dropped: u64,
}

/// Folds every topic whose key names another topic's textid into that
/// topic. Must not run while an ingestion pass is writing to the store.
pub struct Reconciler<'a, S> {
    store: &'a mut S,
}

impl<'a, S: Store> Reconciler<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn run(&mut self) -> Result<MergeReport, StorageError> {
        let pairs = self.store.find_duplicate_pairs()?;
        let mut report = MergeReport {
            pairs_found: pairs.len() as u64,
            ..MergeReport::default()
        };
        info!(pairs = report.pairs_found, "duplicate topics found");

        // from → to for every merge done so far, so later pairs follow
        // topics that were folded away.
        let mut merged_into = HashMap::new();
        for found in &pairs {
            let pair = DuplicatePair {
                from_id: survivor(&merged_into, found.from_id),
                to_id: survivor(&merged_into, found.to_id),
                textid: found.textid.clone(),
            };
            if pair.from_id == pair.to_id {
                debug!(from = %found.from_id, to = %found.to_id, "pair already merged");
                report.skipped += 1;
                continue;
            }
            match self.store.merge_topics(&pair)? {
                Some(stats) => {
                    info!(
                        from = %pair.from_id,
                        to = %pair.to_id,
                        textid = %pair.textid,
                        repointed = stats.repointed,
                        dropped = stats.dropped,
                        "merged topics"
                    );
                    merged_into.insert(pair.from_id, pair.to_id);
                    report.merged += 1;
                    report.repointed += stats.repointed;
                    report.dropped += stats.dropped;
                }
                None => {
                    debug!(from = %pair.from_id, to = %pair.to_id, "pair vanished");
                    report.skipped += 1;
                }
            }
        }

        info!(
            merged = report.merged,
            skipped = report.skipped,
            "reconciliation finished"
        );
        Ok(report)
    }
}

fn survivor(merged_into: &HashMap<TopicId, TopicId>, mut id: TopicId) -> TopicId {
    while let Some(&next) = merged_into.get(&id) {
        id = next;
    }
    id
}
