//! ShardTx - In-memory multi-shard transaction engine with snapshot isolation
//!
//! ShardTx provides optimistically-concurrent transactions over a static set
//! of shards, with atomic cross-shard commit. Transactions read through a
//! consistent snapshot, stage writes privately, and validate at commit time;
//! a write-write conflict aborts the later committer.
//!
//! # Quick start
//!
//! ```
//! use shardtx::{ShardTx, Value};
//!
//! let db = ShardTx::in_memory(["users", "orders"]);
//!
//! let t = db.begin()?;
//! db.write(t, "users", "alice", Value::from("{}"))?;
//! db.write(t, "orders", "o-1", Value::from("alice"))?;
//! assert!(db.commit(t)?.is_committed());
//! # Ok::<(), shardtx::Error>(())
//! ```
//!
//! # Architecture
//!
//! The engine is split across three crates, re-exported here:
//! - `shardtx-core`: types, the `ShardBackend` trait, errors, limits
//! - `shardtx-storage`: per-key version chains, in-memory shards, registry
//! - `shardtx-concurrency`: clock, transaction contexts, commit protocol
//!
//! The facade below wires in-memory shards to a `TransactionManager` and
//! accepts plain strings for shard and key names. Callers embedding a
//! custom `ShardBackend` (for example a remote shard) build a
//! `ShardRegistry` themselves and hand it to `TransactionManager` directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use shardtx_concurrency::{
    Clock, CommitOutcome, Conflict, TransactionManager, TransactionStatus, ValidationResult,
};
pub use shardtx_core::{
    Error, Key, Limits, Mutation, Result, ShardBackend, ShardId, TxnId, Value, VersionRecord,
};
pub use shardtx_storage::{InMemoryShard, Shard, ShardRegistry, VersionChain};

use std::sync::Arc;

/// Convenience wrapper: in-memory shards plus a transaction manager
///
/// All five engine operations (`begin`, `read`, `write`, `commit`,
/// `rollback`) pass straight through to the manager; this type only saves
/// callers the registry wiring and the `ShardId`/`Key` conversions.
#[derive(Debug)]
pub struct ShardTx {
    manager: TransactionManager,
}

impl ShardTx {
    /// Create an engine with one in-memory shard per name
    pub fn in_memory<I, S>(shard_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_limits(shard_names, Limits::default())
    }

    /// Create an engine with explicit limits
    pub fn with_limits<I, S>(shard_names: I, limits: Limits) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Arc::new(ShardRegistry::in_memory(
            shard_names.into_iter().map(|n| ShardId::new(n)),
        ));
        Self {
            manager: TransactionManager::with_limits(registry, limits),
        }
    }

    /// Start a transaction
    pub fn begin(&self) -> Result<TxnId> {
        self.manager.begin()
    }

    /// Read a key through the transaction's snapshot
    pub fn read(&self, txn: TxnId, shard: &str, key: &str) -> Result<Option<Value>> {
        self.manager
            .read(txn, &ShardId::from(shard), &Key::from(key))
    }

    /// Stage a write, applied on commit
    pub fn write(&self, txn: TxnId, shard: &str, key: &str, value: Value) -> Result<()> {
        self.manager
            .write(txn, &ShardId::from(shard), &Key::from(key), value)
    }

    /// Stage a deletion, applied on commit
    pub fn delete(&self, txn: TxnId, shard: &str, key: &str) -> Result<()> {
        self.manager
            .delete(txn, &ShardId::from(shard), &Key::from(key))
    }

    /// Validate and apply the transaction's writes atomically
    pub fn commit(&self, txn: TxnId) -> Result<CommitOutcome> {
        self.manager.commit(txn)
    }

    /// Abort the transaction, discarding staged writes
    pub fn rollback(&self, txn: TxnId) -> Result<()> {
        self.manager.rollback(txn)
    }

    /// The underlying manager, for status queries and maintenance
    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }
}
