//! Core trait definitions
//!
//! `ShardBackend` is the single interface between the transaction manager
//! and a shard's storage. Concrete variants (in-memory, remote) are selected
//! by dependency injection; the manager never knows which one it talks to.
//!
//! Every method returns `Result` so that a remote backend can surface
//! transport failures; the manager maps those to `ShardUnavailable`.

use crate::error::Result;
use crate::types::Key;
use crate::value::Mutation;
use crate::version::VersionRecord;

/// Storage interface for one shard
///
/// Implementations must uphold the append-only history invariant: for each
/// key, records are strictly increasing in `commit_ts`, and `apply` is only
/// called with a timestamp greater than the key's current maximum (the
/// manager guarantees this by holding the shard's commit lock for the whole
/// validate-then-apply sequence).
///
/// Snapshot reads (`read`) must not require the commit lock: a reader asking
/// for a past timestamp is unaffected by concurrent appends of strictly
/// newer records.
pub trait ShardBackend: Send + Sync {
    /// Return the record with the greatest `commit_ts <= ts`, if any
    ///
    /// A tombstone record is returned as-is; interpreting it as "absent"
    /// is the caller's concern (the observed `commit_ts` still matters
    /// for conflict detection).
    fn read(&self, key: &Key, ts: u64) -> Result<Option<VersionRecord>>;

    /// Return the key's current maximum `commit_ts`, if the key has history
    ///
    /// Used purely for conflict validation under the held commit lock.
    fn latest_commit_ts(&self, key: &Key) -> Result<Option<u64>>;

    /// Append a new record to the key's history
    ///
    /// Precondition: `commit_ts` is strictly greater than the key's current
    /// maximum, and the caller holds the shard's commit lock.
    fn apply(&self, key: Key, mutation: Mutation, commit_ts: u64) -> Result<()>;

    /// Remove records carrying exactly `commit_ts` from the key's history
    ///
    /// Only called by the manager to unwind a partially applied commit after
    /// another shard failed, while all shard locks are still held. No reader
    /// can have observed the retracted records.
    fn retract(&self, key: &Key, commit_ts: u64) -> Result<()>;
}
