//! URI → topic id resolution with create-on-demand and an LRU memo.

use std::num::NonZeroUsize;

use lru::LruCache;
use serde::Serialize;
use tracing::debug;

use freebase_core::{Term, TopicId, TopicKey};
use freebase_storage::{StorageError, Store};

pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Resolves dump IRIs to topic ids. The cache is keyed by the raw IRI and
/// only ever holds ids that existed when they were resolved, so it must be
/// dropped before anything deletes topics.
pub struct TopicResolver {
    cache: LruCache<String, TopicId>,
    hits: u64,
    misses: u64,
}

impl Default for TopicResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl TopicResolver {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look `uri` up, inserting a topic when it is unknown and `create` is
    /// set. `Ok(None)` means the IRI cannot name a topic (or does not exist
    /// yet and `create` is off).
    pub fn resolve<S: Store>(
        &mut self,
        store: &mut S,
        uri: &str,
        create: bool,
    ) -> Result<Option<TopicId>, StorageError> {
        if let Some(id) = self.cache.get(uri) {
            self.hits += 1;
            return Ok(Some(*id));
        }
        self.misses += 1;

        let Some(key) = TopicKey::from_uri(uri) else {
            return Ok(None);
        };
        let id = match store.find_topic(&key)? {
            Some(id) => Some(id),
            None if create => match store.insert_topic(&key)? {
                Some(id) => {
                    debug!(%key, %id, "created topic");
                    Some(id)
                }
                // Someone else created it between the lookup and the insert.
                None => store.find_topic(&key)?,
            },
            None => None,
        };

        if let Some(id) = id {
            self.cache.put(uri.to_string(), id);
        }
        Ok(id)
    }

    /// Like [`resolve`](Self::resolve) for a parsed term. Only IRIs name
    /// topics.
    pub fn resolve_term<S: Store>(
        &mut self,
        store: &mut S,
        term: &Term,
        create: bool,
    ) -> Result<Option<TopicId>, StorageError> {
        match term.as_iri() {
            Some(uri) => self.resolve(store, uri, create),
            None => Ok(None),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.len(),
        }
    }
}
