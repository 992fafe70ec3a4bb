//! Per-key version chains for MVCC
//!
//! Versions are stored in descending order (newest first) for efficient
//! snapshot reads - we typically want the most recent version <= snapshot_ts.
//!
//! VecDeque gives O(1) push_front for new versions, which matters for
//! workloads that repeatedly update the same key.

use shardtx_core::{Mutation, VersionRecord};
use std::collections::VecDeque;

/// Append-only history of one key
///
/// Invariant: `commit_ts` values are strictly decreasing front-to-back.
/// `push` enforces this; callers serialize appends through the shard's
/// commit lock.
#[derive(Debug, Clone, Default)]
pub struct VersionChain {
    /// Versions stored newest-first
    versions: VecDeque<VersionRecord>,
}

impl VersionChain {
    /// Append a new record (must be newer than all existing records)
    ///
    /// O(1) via VecDeque::push_front.
    #[inline]
    pub fn push(&mut self, mutation: Mutation, commit_ts: u64) {
        debug_assert!(
            self.latest_commit_ts().map_or(true, |ts| commit_ts > ts),
            "version chain append must be strictly newer"
        );
        self.versions.push_front(VersionRecord {
            mutation,
            commit_ts,
        });
    }

    /// Get the record with the greatest `commit_ts <= ts`
    pub fn get_at(&self, ts: u64) -> Option<&VersionRecord> {
        // Newest-first: scan until the first record at or below ts
        self.versions.iter().find(|rec| rec.commit_ts <= ts)
    }

    /// Get the newest record
    #[inline]
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.versions.front()
    }

    /// The key's current maximum commit_ts, if any history exists
    #[inline]
    pub fn latest_commit_ts(&self) -> Option<u64> {
        self.versions.front().map(|rec| rec.commit_ts)
    }

    /// Remove records carrying exactly `commit_ts`
    ///
    /// Returns true if the chain is now empty. Used only to unwind a failed
    /// multi-shard apply while the shard locks are held.
    pub fn retract(&mut self, commit_ts: u64) -> bool {
        self.versions.retain(|rec| rec.commit_ts != commit_ts);
        self.versions.is_empty()
    }

    /// Remove records older than `min_ts`, always keeping the newest
    ///
    /// Garbage collection for long-running stores. Keeps at least one
    /// record so the key's latest state stays resolvable.
    pub fn gc(&mut self, min_ts: u64) {
        while self.versions.len() > 1 {
            match self.versions.back() {
                Some(oldest) if oldest.commit_ts < min_ts => {
                    self.versions.pop_back();
                }
                _ => break,
            }
        }
    }

    /// Number of records in the chain
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the chain holds no records
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
