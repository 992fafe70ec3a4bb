//! In-memory shard backend
//!
//! DashMap keyed by `Key`, one `VersionChain` per key. Reads are lock-free
//! with respect to the commit protocol; only the entry being appended to is
//! briefly locked by DashMap itself.

use crate::chain::VersionChain;
use dashmap::DashMap;
use shardtx_core::{Error, Key, Mutation, Result, ShardBackend, ShardId, VersionRecord};

/// `ShardBackend` implementation backed by process memory
///
/// Volatile by design: this core has no durability story, a restart loses
/// everything.
#[derive(Debug, Default)]
pub struct InMemoryShard {
    chains: DashMap<Key, VersionChain>,
}

impl InMemoryShard {
    /// Create an empty shard
    pub fn new() -> Self {
        Self {
            chains: DashMap::new(),
        }
    }

    /// Number of keys with at least one version record
    pub fn key_count(&self) -> usize {
        self.chains.len()
    }

    /// Drop records older than `min_ts` from every chain, keeping each
    /// key's newest record
    ///
    /// Out-of-band garbage collection; callers must ensure no active
    /// transaction holds a snapshot older than `min_ts`.
    pub fn gc(&self, min_ts: u64) {
        for mut entry in self.chains.iter_mut() {
            entry.value_mut().gc(min_ts);
        }
    }
}

impl ShardBackend for InMemoryShard {
    fn read(&self, key: &Key, ts: u64) -> Result<Option<VersionRecord>> {
        Ok(self
            .chains
            .get(key)
            .and_then(|chain| chain.get_at(ts).cloned()))
    }

    fn latest_commit_ts(&self, key: &Key) -> Result<Option<u64>> {
        Ok(self.chains.get(key).and_then(|chain| chain.latest_commit_ts()))
    }

    fn apply(&self, key: Key, mutation: Mutation, commit_ts: u64) -> Result<()> {
        let mut chain = self.chains.entry(key).or_default();
        chain.push(mutation, commit_ts);
        Ok(())
    }

    fn retract(&self, key: &Key, commit_ts: u64) -> Result<()> {
        if let Some(mut chain) = self.chains.get_mut(key) {
            if chain.retract(commit_ts) {
                drop(chain);
                // Remove the empty chain so a retracted insert leaves no trace.
                // remove_if re-checks emptiness under the entry lock.
                self.chains.remove_if(key, |_, c| c.is_empty());
            }
        }
        Ok(())
    }
}

/// Test double that fails every mutating call
///
/// Models an unreachable remote shard; used to exercise the
/// `ShardUnavailable` paths and the no-partial-write guarantee.
#[derive(Debug)]
pub struct UnavailableShard {
    shard: ShardId,
}

impl UnavailableShard {
    /// Create a backend that reports `shard` as unreachable
    pub fn new(shard: ShardId) -> Self {
        Self { shard }
    }

    fn unavailable(&self) -> Error {
        Error::ShardUnavailable {
            shard: self.shard.clone(),
            reason: "backend unreachable".to_string(),
        }
    }
}

impl ShardBackend for UnavailableShard {
    fn read(&self, _key: &Key, _ts: u64) -> Result<Option<VersionRecord>> {
        Err(self.unavailable())
    }

    fn latest_commit_ts(&self, _key: &Key) -> Result<Option<u64>> {
        Err(self.unavailable())
    }

    fn apply(&self, _key: Key, _mutation: Mutation, _commit_ts: u64) -> Result<()> {
        Err(self.unavailable())
    }

    fn retract(&self, _key: &Key, _commit_ts: u64) -> Result<()> {
        Err(self.unavailable())
    }
}
