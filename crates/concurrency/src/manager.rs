//! Transaction manager
//!
//! Owns the clock and the table of in-flight transactions; exposes
//! begin/read/write/delete/commit/rollback and runs the validate-then-apply
//! protocol across the shards a transaction touched.
//!
//! ## Commit sequence
//!
//! ```text
//! 1. Resolve the distinct shards of read_set ∪ write_set
//! 2. Acquire each shard's commit lock in ascending ShardId order
//! 3. Re-check every read set entry under the held locks
//! 4. IF stale reads: release locks, mark Aborted, return Aborted(conflicts)
//! 5. clock.advance() once -> commit_ts for every write
//! 6. Apply the write set; a backend failure retracts what was applied
//! 7. clock.publish(commit_ts): new snapshots may now see the commit
//! 8. Release locks, mark Committed, return Committed { commit_ts }
//! ```
//!
//! Steps 3-7 happen while every touched shard is locked, so no other
//! transaction can interleave a conflicting commit between validation and
//! apply, and either all staged writes land or none do. The allocated
//! timestamp is published only after the apply phase, so a snapshot taken
//! at or above a commit_ts always reflects every write of that commit.
//! The protocol runs against a snapshot of the context's read and write
//! sets, with the context itself marked Validating; the transaction table
//! stays responsive to unrelated operations throughout.

use crate::clock::Clock;
use crate::transaction::{TransactionContext, TransactionStatus};
use crate::validation::{validate_read_set, ValidationResult};
use dashmap::DashMap;
use shardtx_core::{
    Error, Key, Limits, Mutation, Result, ShardId, TxnId, TS_ABSENT, Value,
};
use shardtx_storage::{Shard, ShardRegistry};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Outcome of `commit`
///
/// Conflict is a normal, expected outcome, not an error: callers decide
/// whether to retry with a fresh transaction. Genuine failures
/// (`InvalidState`, `ShardUnavailable`, ...) surface as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All staged writes applied with the given timestamp
    Committed {
        /// Timestamp shared by every write of this transaction
        commit_ts: u64,
    },
    /// A read baseline went stale; nothing was applied
    Aborted(ValidationResult),
}

impl CommitOutcome {
    /// Whether the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    /// The assigned commit timestamp, if committed
    pub fn commit_ts(&self) -> Option<u64> {
        match self {
            CommitOutcome::Committed { commit_ts } => Some(*commit_ts),
            CommitOutcome::Aborted(_) => None,
        }
    }
}

/// Coordinates transactions over a registry of shards
///
/// All state is instance-owned: the clock, the transaction table, and the
/// id counter live in the manager, never in module globals. Clones of the
/// registry handle are shared with whoever constructed it.
pub struct TransactionManager {
    clock: Clock,
    registry: Arc<ShardRegistry>,
    transactions: DashMap<TxnId, TransactionContext>,
    next_txn_id: AtomicU64,
    active: AtomicUsize,
    limits: Limits,
}

impl TransactionManager {
    /// Create a manager over the given registry with default limits
    pub fn new(registry: Arc<ShardRegistry>) -> Self {
        Self::with_limits(registry, Limits::default())
    }

    /// Create a manager with explicit limits
    pub fn with_limits(registry: Arc<ShardRegistry>, limits: Limits) -> Self {
        Self {
            clock: Clock::new(),
            registry,
            transactions: DashMap::new(),
            next_txn_id: AtomicU64::new(1),
            active: AtomicUsize::new(0),
            limits,
        }
    }

    /// Current clock value (the snapshot_ts a transaction begun now would get)
    pub fn current_ts(&self) -> u64 {
        self.clock.now()
    }

    /// Number of Active transactions
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// The registry this manager commits against
    pub fn registry(&self) -> &Arc<ShardRegistry> {
        &self.registry
    }

    // === Public operations ===

    /// Start a transaction; its snapshot is the clock value at this moment
    pub fn begin(&self) -> Result<TxnId> {
        let prev = self.active.fetch_add(1, Ordering::SeqCst);
        if prev >= self.limits.max_active_transactions {
            self.active.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::LimitExceeded {
                active: prev,
                limit: self.limits.max_active_transactions,
            });
        }

        let txn_id = TxnId::new(self.next_txn_id.fetch_add(1, Ordering::SeqCst));
        let ctx = TransactionContext::new(txn_id, self.clock.now());
        tracing::debug!(txn = %txn_id, snapshot_ts = ctx.snapshot_ts, "begin");
        self.transactions.insert(txn_id, ctx);
        Ok(txn_id)
    }

    /// Read a key through the transaction's snapshot
    ///
    /// Staged mutations shadow the snapshot (read-your-writes); a staged
    /// tombstone reads as absent. Snapshot reads record their observed
    /// commit_ts for commit-time validation.
    pub fn read(&self, txn: TxnId, shard: &ShardId, key: &Key) -> Result<Option<Value>> {
        let mut entry = self.context_mut(txn)?;
        let ctx = entry.value_mut();
        ctx.ensure_active()?;

        if let Some(mutation) = ctx.staged(shard, key) {
            return Ok(mutation.value().cloned());
        }

        let (observed_ts, value) = self.snapshot_read(shard, key, ctx.snapshot_ts)?;
        ctx.record_read(shard.clone(), key.clone(), observed_ts);
        Ok(value)
    }

    /// Stage a write; applied only on successful commit
    pub fn write(&self, txn: TxnId, shard: &ShardId, key: &Key, value: Value) -> Result<()> {
        self.stage(txn, shard, key, Mutation::Put(value))
    }

    /// Stage a deletion (tombstone); applied only on successful commit
    pub fn delete(&self, txn: TxnId, shard: &ShardId, key: &Key) -> Result<()> {
        self.stage(txn, shard, key, Mutation::Tombstone)
    }

    /// Commit: validate every read baseline, then apply atomically
    ///
    /// The context is snapshotted and marked Validating up front, so the
    /// table entry is not held across shard locks and backend calls; other
    /// operations on the same transaction fail with `InvalidState` until
    /// the terminal status lands.
    pub fn commit(&self, txn: TxnId) -> Result<CommitOutcome> {
        let (read_set, write_set, touched) = {
            let mut entry = self.context_mut(txn)?;
            let ctx = entry.value_mut();
            ctx.ensure_active()?;
            ctx.mark_validating();
            (
                ctx.read_set().clone(),
                ctx.write_set().clone(),
                ctx.touched_shards(),
            )
        };

        let outcome = self.run_commit(&read_set, &write_set, touched);

        // A Validating entry is never purged, so the re-lookup cannot miss.
        let mut entry = self.context_mut(txn)?;
        let ctx = entry.value_mut();
        match &outcome {
            Ok(CommitOutcome::Committed { commit_ts }) => {
                ctx.mark_committed();
                tracing::debug!(
                    txn = %txn,
                    commit_ts,
                    writes = write_set.len(),
                    elapsed_ms = ctx.elapsed().as_millis() as u64,
                    "committed"
                );
            }
            Ok(CommitOutcome::Aborted(validation)) => {
                tracing::warn!(
                    txn = %txn,
                    conflicts = validation.conflict_count(),
                    "commit aborted on conflict"
                );
                ctx.mark_aborted(format!("{} stale read(s)", validation.conflict_count()));
            }
            Err(e) => {
                tracing::error!(txn = %txn, error = %e, "commit failed, nothing applied");
                ctx.mark_aborted(format!("shard failure: {}", e));
            }
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    /// The validate-then-apply protocol; runs without the table entry held
    fn run_commit(
        &self,
        read_set: &BTreeMap<(ShardId, Key), u64>,
        write_set: &BTreeMap<(ShardId, Key), Mutation>,
        touched: BTreeSet<ShardId>,
    ) -> Result<CommitOutcome> {
        // Resolve touched shards; BTreeMap keeps them in ascending ShardId
        // order, which is the global lock order.
        let mut shards: BTreeMap<ShardId, Arc<Shard>> = BTreeMap::new();
        for shard_id in touched {
            let shard = Arc::clone(self.registry.get(&shard_id)?);
            shards.insert(shard_id, shard);
        }

        let guards: Vec<_> = shards.values().map(|s| s.commit_lock().lock()).collect();

        let validation = validate_read_set(read_set, &shards)?;
        if !validation.is_valid() {
            return Ok(CommitOutcome::Aborted(validation));
        }

        // Validation passed for every entry: this commit is now decided,
        // stamp it. The allocated timestamp stays invisible to new
        // snapshots until the apply phase publishes it.
        let commit_ts = self.clock.advance();

        let mut applied: Vec<(ShardId, Key)> = Vec::new();
        let mut apply_err: Option<Error> = None;
        for ((shard_id, key), mutation) in write_set {
            let shard = &shards[shard_id];
            match shard
                .backend()
                .apply(key.clone(), mutation.clone(), commit_ts)
            {
                Ok(()) => applied.push((shard_id.clone(), key.clone())),
                Err(e) => {
                    apply_err = Some(e.into_unavailable(shard_id));
                    break;
                }
            }
        }

        if let Some(e) = apply_err {
            self.unwind_applied(&shards, &applied, commit_ts);
            // Nothing carries this timestamp any more; release the watermark
            self.clock.publish(commit_ts);
            return Err(e);
        }

        // Every record is in place; let new snapshots see the commit
        self.clock.publish(commit_ts);
        drop(guards);
        Ok(CommitOutcome::Committed { commit_ts })
    }

    /// Roll back an Active transaction, discarding its staged writes
    pub fn rollback(&self, txn: TxnId) -> Result<()> {
        let mut entry = self.context_mut(txn)?;
        let ctx = entry.value_mut();
        ctx.ensure_active()?;
        self.finish_aborted(ctx, "rolled back by caller");
        tracing::debug!(txn = %txn, "rolled back");
        Ok(())
    }

    // === Introspection / maintenance ===

    /// Status of a transaction, terminal ones included
    pub fn status(&self, txn: TxnId) -> Result<TransactionStatus> {
        let entry = self
            .transactions
            .get(&txn)
            .ok_or(Error::TransactionNotFound(txn))?;
        Ok(entry.status().clone())
    }

    /// The snapshot timestamp of a transaction
    pub fn snapshot_ts(&self, txn: TxnId) -> Result<u64> {
        let entry = self
            .transactions
            .get(&txn)
            .ok_or(Error::TransactionNotFound(txn))?;
        Ok(entry.snapshot_ts)
    }

    /// Drop terminal transactions from the table, returning how many
    ///
    /// Until this is called, a second commit/rollback of a terminal
    /// transaction reports `InvalidState` rather than `TransactionNotFound`.
    pub fn purge_finished(&self) -> usize {
        let before = self.transactions.len();
        self.transactions.retain(|_, ctx| !ctx.is_terminal());
        before - self.transactions.len()
    }

    // === Internals ===

    fn context_mut(
        &self,
        txn: TxnId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, TxnId, TransactionContext>> {
        self.transactions
            .get_mut(&txn)
            .ok_or(Error::TransactionNotFound(txn))
    }

    /// Snapshot read through the backend; returns (observed_ts, value)
    ///
    /// A tombstone reads as absent but still carries its commit_ts into the
    /// read set; a missing key observes TS_ABSENT.
    fn snapshot_read(
        &self,
        shard: &ShardId,
        key: &Key,
        snapshot_ts: u64,
    ) -> Result<(u64, Option<Value>)> {
        let s = self.registry.get(shard)?;
        let record = s
            .backend()
            .read(key, snapshot_ts)
            .map_err(|e| e.into_unavailable(shard))?;
        Ok(match record {
            Some(rec) => {
                let value = match rec.mutation {
                    Mutation::Put(v) => Some(v),
                    Mutation::Tombstone => None,
                };
                (rec.commit_ts, value)
            }
            None => (TS_ABSENT, None),
        })
    }

    /// Stage a mutation, establishing the read-before-write baseline first
    ///
    /// If the pair has never been read in this transaction, perform the
    /// equivalent of `read` so the write participates in conflict
    /// detection; a blind write can never escape validation.
    fn stage(&self, txn: TxnId, shard: &ShardId, key: &Key, mutation: Mutation) -> Result<()> {
        let mut entry = self.context_mut(txn)?;
        let ctx = entry.value_mut();
        ctx.ensure_active()?;

        if ctx.observed(shard, key).is_none() {
            let (observed_ts, _) = self.snapshot_read(shard, key, ctx.snapshot_ts)?;
            ctx.record_read(shard.clone(), key.clone(), observed_ts);
        }

        ctx.stage(shard.clone(), key.clone(), mutation);
        Ok(())
    }

    /// Retract already-applied records after a mid-apply failure
    ///
    /// Runs with all shard locks still held, so none of the retracted
    /// records were observable.
    fn unwind_applied(
        &self,
        shards: &BTreeMap<ShardId, Arc<Shard>>,
        applied: &[(ShardId, Key)],
        commit_ts: u64,
    ) {
        for (shard_id, key) in applied.iter().rev() {
            if let Err(e) = shards[shard_id].backend().retract(key, commit_ts) {
                tracing::error!(
                    shard = %shard_id,
                    key = %key,
                    commit_ts,
                    error = %e,
                    "retract failed while unwinding commit"
                );
            }
        }
    }

    fn finish_aborted(&self, ctx: &mut TransactionContext, reason: impl Into<String>) {
        ctx.mark_aborted(reason);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("current_ts", &self.clock.now())
            .field("transactions", &self.transactions.len())
            .field("active", &self.active_count())
            .finish()
    }
}
