//! Document Collection Cache
//!
//! Maps collection ids to live indexes with three-tier resolution:
//! memory, then disk, then a fresh build. Uploaded collections live in a
//! bounded LRU; anything evicted stays on disk and reloads on demand.
//!
//! Resolution is single-flight per id: concurrent callers for the same new
//! collection wait on one build. A failed build inserts nothing.

use crate::index::VectorIndex;
use crate::store::IndexStore;
use legalrag_common::errors::{AppError, Result};
use legalrag_common::metrics;
use legalrag_common::models::{Chunk, CollectionId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};

/// Where a resolved index came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Memory,
    Disk,
    Build,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Memory => "memory",
            Tier::Disk => "disk",
            Tier::Build => "build",
        }
    }
}

/// Whether a resolved index is kept in the LRU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retention {
    Lru,
    /// Owned by the caller (the reference library), never evicted
    Pinned,
}

struct LruEntries {
    map: HashMap<CollectionId, (Arc<VectorIndex>, u64)>,
    tick: u64,
}

impl LruEntries {
    fn get(&mut self, id: &CollectionId) -> Option<Arc<VectorIndex>> {
        self.tick += 1;
        let tick = self.tick;
        self.map.get_mut(id).map(|(index, used)| {
            *used = tick;
            index.clone()
        })
    }

    fn insert(&mut self, id: CollectionId, index: Arc<VectorIndex>, capacity: usize) {
        self.tick += 1;
        if !self.map.contains_key(&id) {
            while self.map.len() >= capacity {
                let Some(oldest) = self.map.iter().min_by_key(|(_, (_, used))| *used).map(|(k, _)| k.clone()) else {
                    break;
                };
                self.map.remove(&oldest);
                debug!(collection = %oldest, "Evicted collection from memory");
            }
        }
        self.map.insert(id, (index, self.tick));
    }
}

/// Process-wide registry of collection indexes
pub struct CollectionCache {
    store: IndexStore,
    capacity: usize,
    entries: Mutex<LruEntries>,
    in_flight: Mutex<HashMap<CollectionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl CollectionCache {
    pub fn new(store: IndexStore, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            entries: Mutex::new(LruEntries {
                map: HashMap::new(),
                tick: 0,
            }),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Uploaded collections currently in memory
    pub fn len(&self) -> usize {
        self.lock_entries().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &CollectionId) -> bool {
        self.lock_entries().map.contains_key(id)
    }

    /// Resolve `id`, building from `loader`'s chunks only when neither memory
    /// nor disk has it. The result is kept in the LRU.
    pub async fn resolve<F, Fut>(&self, id: &CollectionId, loader: F) -> Result<Arc<VectorIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Chunk>>>,
    {
        self.resolve_with(id, Some(loader), Retention::Lru)
            .await?
            .ok_or_else(|| AppError::CollectionNotFound { id: id.to_string() })
    }

    /// Same tiers as [`resolve`](Self::resolve), but the index is handed to
    /// the caller without entering the LRU
    pub async fn resolve_pinned<F, Fut>(&self, id: &CollectionId, loader: F) -> Result<Arc<VectorIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Chunk>>>,
    {
        self.resolve_with(id, Some(loader), Retention::Pinned)
            .await?
            .ok_or_else(|| AppError::CollectionNotFound { id: id.to_string() })
    }

    /// Memory or disk only; never builds
    pub async fn resolve_existing(&self, id: &CollectionId) -> Result<Option<Arc<VectorIndex>>> {
        self.resolve_with(id, None::<fn() -> std::future::Ready<Result<Vec<Chunk>>>>, Retention::Lru)
            .await
    }

    #[instrument(skip(self, loader), fields(collection = %id))]
    async fn resolve_with<F, Fut>(
        &self,
        id: &CollectionId,
        loader: Option<F>,
        retention: Retention,
    ) -> Result<Option<Arc<VectorIndex>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Chunk>>>,
    {
        let cached = self.lock_entries().get(id);
        if let Some(index) = cached {
            metrics::record_collection_lookup(Tier::Memory.as_str());
            return Ok(Some(index));
        }

        let gate = self.gate_for(id);
        let result = {
            let _turn = gate.lock().await;
            self.resolve_locked(id, loader, retention).await
        };
        self.release_gate(id, gate);

        let resolved = result?;
        if let Some((_, tier)) = &resolved {
            metrics::record_collection_lookup(tier.as_str());
            debug!(tier = tier.as_str(), "Resolved collection");
        }
        metrics::set_collections_cached(self.len());
        Ok(resolved.map(|(index, _)| index))
    }

    async fn resolve_locked<F, Fut>(
        &self,
        id: &CollectionId,
        loader: Option<F>,
        retention: Retention,
    ) -> Result<Option<(Arc<VectorIndex>, Tier)>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Chunk>>>,
    {
        // Another caller may have finished while we waited
        let cached = self.lock_entries().get(id);
        if let Some(index) = cached {
            return Ok(Some((index, Tier::Memory)));
        }

        if let Some(index) = self.store.load(id).await? {
            self.retain(id, &index, retention);
            return Ok(Some((index, Tier::Disk)));
        }

        let Some(loader) = loader else {
            return Ok(None);
        };

        let chunks = loader().await?;
        let index = self.store.build_and_persist(id, chunks).await?;
        self.retain(id, &index, retention);
        Ok(Some((index, Tier::Build)))
    }

    fn retain(&self, id: &CollectionId, index: &Arc<VectorIndex>, retention: Retention) {
        if retention == Retention::Lru {
            self.lock_entries().insert(id.clone(), index.clone(), self.capacity);
        }
    }

    fn gate_for(&self, id: &CollectionId) -> Arc<tokio::sync::Mutex<()>> {
        self.lock_in_flight().entry(id.clone()).or_default().clone()
    }

    fn release_gate(&self, id: &CollectionId, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.lock_in_flight();
        // Only the map and this caller hold it: nobody else is waiting
        if Arc::strong_count(&gate) <= 2 {
            in_flight.remove(id);
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, LruEntries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<CollectionId, Arc<tokio::sync::Mutex<()>>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
