//! Shard registry
//!
//! Static mapping from `ShardId` to a shard instance; pure lookup, no logic.
//! Each `Shard` pairs its backend with the commit lock the transaction
//! manager holds through a validate-then-apply sequence.
//!
//! The registry uses a BTreeMap so iteration over touched shards naturally
//! yields the ascending-ShardId lock-acquisition order.

use parking_lot::Mutex;
use shardtx_core::{Error, Result, ShardBackend, ShardId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One shard: a backend plus its commit lock
pub struct Shard {
    id: ShardId,
    backend: Arc<dyn ShardBackend>,
    /// Held for the whole validate-then-apply sequence of any commit
    /// touching this shard. Snapshot reads never take it.
    commit_lock: Mutex<()>,
}

impl Shard {
    /// Create a shard over the given backend
    pub fn new(id: ShardId, backend: Arc<dyn ShardBackend>) -> Self {
        Self {
            id,
            backend,
            commit_lock: Mutex::new(()),
        }
    }

    /// The shard's identifier
    pub fn id(&self) -> &ShardId {
        &self.id
    }

    /// The shard's storage backend
    pub fn backend(&self) -> &Arc<dyn ShardBackend> {
        &self.backend
    }

    /// The commit lock guarding validate-then-apply on this shard
    pub fn commit_lock(&self) -> &Mutex<()> {
        &self.commit_lock
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard").field("id", &self.id).finish()
    }
}

/// Static mapping from shard id to shard instance
///
/// Built once at construction; shards are never added or removed afterwards.
#[derive(Debug, Default)]
pub struct ShardRegistry {
    shards: BTreeMap<ShardId, Arc<Shard>>,
}

impl ShardRegistry {
    /// Build a registry from (id, backend) pairs
    pub fn new(backends: impl IntoIterator<Item = (ShardId, Arc<dyn ShardBackend>)>) -> Self {
        let shards = backends
            .into_iter()
            .map(|(id, backend)| {
                let shard = Arc::new(Shard::new(id.clone(), backend));
                (id, shard)
            })
            .collect();
        Self { shards }
    }

    /// Build a registry of in-memory shards with the given names
    pub fn in_memory(names: impl IntoIterator<Item = ShardId>) -> Self {
        Self::new(names.into_iter().map(|id| {
            let backend: Arc<dyn ShardBackend> = Arc::new(crate::memory::InMemoryShard::new());
            (id, backend)
        }))
    }

    /// Look up a shard; unknown ids are an error
    pub fn get(&self, id: &ShardId) -> Result<&Arc<Shard>> {
        self.shards
            .get(id)
            .ok_or_else(|| Error::ShardNotFound(id.clone()))
    }

    /// Whether the registry knows this shard
    pub fn contains(&self, id: &ShardId) -> bool {
        self.shards.contains_key(id)
    }

    /// All shard ids in ascending order
    pub fn shard_ids(&self) -> impl Iterator<Item = &ShardId> {
        self.shards.keys()
    }

    /// Number of registered shards
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}
