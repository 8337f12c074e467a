// ============================================================================
// src/resolver/cache.rs - Resolved collection cache
// ============================================================================
//
// Two maps per cache:
// - ready: immutable entity lists with their fetch time, LRU-bounded
// - in_flight: the shared future of each fetch currently running, unbounded
//
// Capacity pressure only ever evicts ready entries, so a running fetch is
// always found by the next caller for its key. A completing fetch stores
// its result only if its own in-flight record is still there, so an
// invalidation issued while a fetch runs is never undone by that fetch.
//
// ============================================================================

use crate::core::{CollectionKind, EngineConfig, Entity, ResolverKey, Result};
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<Arc<[Entity]>>>>;

/// A stored collection
#[derive(Debug, Clone)]
pub struct CacheEntry {
    entities: Arc<[Entity]>,
    fetched_at: Instant,
}

impl CacheEntry {
    pub fn entities(&self) -> &Arc<[Entity]> {
        &self.entities
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn find(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) <= ttl
    }
}

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

pub(crate) enum Lookup {
    Fresh(Arc<[Entity]>),
    /// Joined a fetch started by an earlier caller
    Pending(SharedFetch),
    /// Started a new fetch
    Started(SharedFetch),
}

/// Counters for observing cache behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub failures: u64,
    pub invalidations: u64,
}

struct CacheState {
    ready: LruCache<ResolverKey, CacheEntry>,
    in_flight: HashMap<ResolverKey, InFlight>,
    next_generation: u64,
    stats: CacheStats,
}

impl CacheState {
    /// Remove the in-flight record of `key` if it belongs to `generation`
    fn release(&mut self, key: &ResolverKey, generation: u64) -> bool {
        let owns = self
            .in_flight
            .get(key)
            .is_some_and(|running| running.generation == generation);
        if owns {
            self.in_flight.remove(key);
        }
        owns
    }
}

/// Process-wide store of resolved collections.
///
/// Construct once and hand it to every resolver that should share results.
/// `capacity` bounds the number of stored collections; fetches in flight
/// are not counted against it.
pub struct ReferenceCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl ReferenceCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            state: Mutex::new(CacheState {
                ready: LruCache::new(capacity),
                in_flight: HashMap::new(),
                next_generation: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.cache_ttl, config.cache_capacity)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Every critical section leaves the state consistent; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh entry for `key`; stale entries are dropped and reported absent
    pub fn entry(&self, key: &ResolverKey) -> Option<CacheEntry> {
        let mut state = self.lock();
        let now = Instant::now();

        let entry = state.ready.get(key)?.clone();
        if entry.is_fresh(self.ttl, now) {
            Some(entry)
        } else {
            state.ready.pop(key);
            None
        }
    }

    pub fn is_pending(&self, key: &ResolverKey) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    /// Return a fresh entry, join the running fetch, or start one via `start`.
    ///
    /// `start` runs under the cache lock and must not block.
    pub(crate) fn lookup_or_start<F>(&self, key: &ResolverKey, start: F) -> Lookup
    where
        F: FnOnce(u64) -> SharedFetch,
    {
        let mut guard = self.lock();
        let state = &mut *guard;
        let now = Instant::now();

        if let Some(entry) = state.ready.get(key) {
            if entry.is_fresh(self.ttl, now) {
                let entities = Arc::clone(&entry.entities);
                state.stats.hits += 1;
                return Lookup::Fresh(entities);
            }
            state.ready.pop(key);
        }

        if let Some(running) = state.in_flight.get(key) {
            let fetch = running.fetch.clone();
            state.stats.coalesced += 1;
            return Lookup::Pending(fetch);
        }

        state.stats.misses += 1;
        let generation = state.next_generation;
        state.next_generation += 1;

        let fetch = start(generation);
        state.in_flight.insert(
            key.clone(),
            InFlight {
                generation,
                fetch: fetch.clone(),
            },
        );
        Lookup::Started(fetch)
    }

    /// Settle the fetch identified by `generation`
    pub(crate) fn complete(
        &self,
        key: &ResolverKey,
        generation: u64,
        outcome: Result<Vec<Entity>>,
    ) -> Result<Arc<[Entity]>> {
        let mut state = self.lock();
        let owns = state.release(key, generation);

        match outcome {
            Ok(entities) => {
                let entities: Arc<[Entity]> = entities.into();
                if owns {
                    state.ready.put(
                        key.clone(),
                        CacheEntry {
                            entities: Arc::clone(&entities),
                            fetched_at: Instant::now(),
                        },
                    );
                }
                Ok(entities)
            }
            Err(err) => {
                state.stats.failures += 1;
                Err(err)
            }
        }
    }

    /// Drop the in-flight record of a fetch that ended without an outcome
    pub(crate) fn abandon(&self, key: &ResolverKey, generation: u64) {
        let mut state = self.lock();
        state.release(key, generation);
        state.stats.failures += 1;
    }

    /// Drop one collection, every kind of one catalog, every catalog of one
    /// kind, or everything. Running fetches for matching keys are forgotten
    /// too. Returns the number of keys removed.
    pub fn invalidate(&self, catalog: Option<&str>, kind: Option<CollectionKind>) -> usize {
        let mut guard = self.lock();
        let state = &mut *guard;
        let matches = |key: &ResolverKey| {
            catalog.is_none_or(|c| key.catalog == c) && kind.is_none_or(|k| key.kind == k)
        };

        let doomed: Vec<ResolverKey> = state
            .ready
            .iter()
            .map(|(key, _)| key)
            .chain(state.in_flight.keys())
            .filter(|key| matches(*key))
            .cloned()
            .collect();

        for key in &doomed {
            state.ready.pop(key);
            state.in_flight.remove(key);
        }
        state.stats.invalidations += doomed.len() as u64;
        doomed.len()
    }

    pub fn clear(&self) -> usize {
        self.invalidate(None, None)
    }

    /// Number of keys stored or in flight
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.ready.len() + state.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
