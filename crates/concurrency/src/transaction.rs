//! Transaction context for OCC
//!
//! TransactionContext tracks the read set and staged write set of one
//! transaction, enabling validation at commit time.
//!
//! # Read-set tracking
//!
//! Every snapshot read records the observed `commit_ts` per `(shard, key)`
//! (0 when the key was absent). At commit time those observations are
//! re-checked under the shard commit locks; any mismatch is a conflict.
//! Because the manager establishes a read baseline before every write,
//! every write participates in conflict detection.
//!
//! # Lifecycle
//!
//! `Active --commit--> Validating --ok--> Committed`
//! `Active --commit--> Validating --conflict/failure--> Aborted`
//! `Active --rollback--> Aborted`
//!
//! The manager marks a context Validating before releasing its table entry
//! for the commit protocol; other operations on the transaction fail with
//! `InvalidState` for the duration. Committed and Aborted are terminal; no
//! transition ever leaves them.

use shardtx_core::{Error, Key, Mutation, Result, ShardId, TxnId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, Instant};

/// Status of a transaction in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Commit in progress; the context is owned by the commit protocol
    Validating,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Active => write!(f, "Active"),
            TransactionStatus::Validating => write!(f, "Validating"),
            TransactionStatus::Committed => write!(f, "Committed"),
            TransactionStatus::Aborted { reason } => write!(f, "Aborted ({})", reason),
        }
    }
}

/// Per-transaction state: snapshot, read set, staged writes
///
/// Mutated only through the owning manager; all methods that change state
/// require `Active` status.
pub struct TransactionContext {
    /// Unique transaction ID
    pub txn_id: TxnId,
    /// Clock value captured at begin; defines the consistent read view
    pub snapshot_ts: u64,
    /// Observed commit_ts per (shard, key); 0 means "was absent"
    read_set: BTreeMap<(ShardId, Key), u64>,
    /// Staged mutations per (shard, key), applied atomically on commit
    write_set: BTreeMap<(ShardId, Key), Mutation>,
    status: TransactionStatus,
    start_time: Instant,
}

impl TransactionContext {
    /// Create an Active context with the given snapshot timestamp
    pub fn new(txn_id: TxnId, snapshot_ts: u64) -> Self {
        Self {
            txn_id,
            snapshot_ts,
            read_set: BTreeMap::new(),
            write_set: BTreeMap::new(),
            status: TransactionStatus::Active,
            start_time: Instant::now(),
        }
    }

    // === Read/write set bookkeeping ===

    /// Record the commit_ts observed for a snapshot read
    ///
    /// First observation wins: a later re-read of the same pair must not
    /// overwrite the original baseline, otherwise a conflicting commit that
    /// lands between the two reads would go undetected.
    pub fn record_read(&mut self, shard: ShardId, key: Key, observed_ts: u64) {
        self.read_set.entry((shard, key)).or_insert(observed_ts);
    }

    /// The observed commit_ts for a pair, if it has been read
    pub fn observed(&self, shard: &ShardId, key: &Key) -> Option<u64> {
        self.read_set.get(&(shard.clone(), key.clone())).copied()
    }

    /// The staged mutation for a pair, if any (read-your-writes)
    pub fn staged(&self, shard: &ShardId, key: &Key) -> Option<&Mutation> {
        self.write_set.get(&(shard.clone(), key.clone()))
    }

    /// Stage a mutation; the latest stage for a pair wins
    pub fn stage(&mut self, shard: ShardId, key: Key, mutation: Mutation) {
        self.write_set.insert((shard, key), mutation);
    }

    /// The read set, keyed by (shard, key)
    pub fn read_set(&self) -> &BTreeMap<(ShardId, Key), u64> {
        &self.read_set
    }

    /// The staged write set, keyed by (shard, key)
    pub fn write_set(&self) -> &BTreeMap<(ShardId, Key), Mutation> {
        &self.write_set
    }

    /// Distinct shards referenced by the read and write sets, ascending
    pub fn touched_shards(&self) -> BTreeSet<ShardId> {
        self.read_set
            .keys()
            .chain(self.write_set.keys())
            .map(|(shard, _)| shard.clone())
            .collect()
    }

    /// Number of (shard, key) pairs read from snapshots
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Number of staged mutations
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    /// Whether the transaction has no staged mutations
    ///
    /// Read-only transactions always commit: they have nothing to apply and,
    /// with write-write-only conflict semantics, nothing to conflict on.
    pub fn is_read_only(&self) -> bool {
        self.write_set.is_empty()
    }

    // === State management ===

    /// Current status
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Whether the transaction is Active
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Whether the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed)
    }

    /// Whether the transaction is in a terminal state
    ///
    /// Validating is not terminal: the commit protocol still owns the
    /// context and will transition it.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            TransactionStatus::Committed | TransactionStatus::Aborted { .. }
        )
    }

    /// Error unless the transaction is Active
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::InvalidState {
                txn: self.txn_id,
                status: self.status.to_string(),
            })
        }
    }

    /// Transition `Active -> Validating`
    ///
    /// Entered by the commit protocol after snapshotting the read and write
    /// sets; blocks every other operation on this transaction until a
    /// terminal transition lands.
    pub fn mark_validating(&mut self) {
        debug_assert!(self.is_active(), "validate from non-Active state");
        self.status = TransactionStatus::Validating;
    }

    /// Transition to `Committed`
    ///
    /// Callers check `ensure_active` first; the assertion guards the
    /// terminal-state invariant in debug builds.
    pub fn mark_committed(&mut self) {
        debug_assert!(!self.is_terminal(), "commit from terminal state");
        self.status = TransactionStatus::Committed;
    }

    /// Transition to `Aborted`, discarding staged writes
    ///
    /// The read set is kept for diagnostics (conflict reporting refers
    /// to it).
    pub fn mark_aborted(&mut self, reason: impl Into<String>) {
        debug_assert!(!self.is_terminal(), "abort from terminal state");
        self.status = TransactionStatus::Aborted {
            reason: reason.into(),
        };
        self.write_set.clear();
    }

    /// Reason string if the transaction was aborted
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }

    /// Time since the transaction began
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("snapshot_ts", &self.snapshot_ts)
            .field("status", &self.status)
            .field("reads", &self.read_set.len())
            .field("writes", &self.write_set.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardtx_core::Value;

    fn pair(shard: &str, key: &str) -> (ShardId, Key) {
        (ShardId::from(shard), Key::from(key))
    }

    #[test]
    fn test_new_context_is_active() {
        let ctx = TransactionContext::new(TxnId::new(1), 10);
        assert!(ctx.is_active());
        assert_eq!(ctx.snapshot_ts, 10);
        assert!(ctx.is_read_only());
    }

    #[test]
    fn test_record_read_first_observation_wins() {
        let mut ctx = TransactionContext::new(TxnId::new(1), 10);
        let (s, k) = pair("s", "x");
        ctx.record_read(s.clone(), k.clone(), 3);
        ctx.record_read(s.clone(), k.clone(), 7);
        assert_eq!(ctx.observed(&s, &k), Some(3));
    }

    #[test]
    fn test_stage_latest_wins() {
        let mut ctx = TransactionContext::new(TxnId::new(1), 10);
        let (s, k) = pair("s", "x");
        ctx.stage(s.clone(), k.clone(), Mutation::Put(Value::from("v1")));
        ctx.stage(s.clone(), k.clone(), Mutation::Put(Value::from("v2")));
        assert_eq!(
            ctx.staged(&s, &k),
            Some(&Mutation::Put(Value::from("v2")))
        );
        assert_eq!(ctx.write_count(), 1);
        assert!(!ctx.is_read_only());
    }

    #[test]
    fn test_stage_tombstone_shadows_put() {
        let mut ctx = TransactionContext::new(TxnId::new(1), 10);
        let (s, k) = pair("s", "x");
        ctx.stage(s.clone(), k.clone(), Mutation::Put(Value::from("v1")));
        ctx.stage(s.clone(), k.clone(), Mutation::Tombstone);
        assert!(ctx.staged(&s, &k).unwrap().is_tombstone());
    }

    #[test]
    fn test_touched_shards_ascending_and_deduped() {
        let mut ctx = TransactionContext::new(TxnId::new(1), 10);
        ctx.record_read(ShardId::from("b"), Key::from("x"), 1);
        ctx.stage(ShardId::from("a"), Key::from("y"), Mutation::Tombstone);
        ctx.stage(ShardId::from("b"), Key::from("z"), Mutation::Tombstone);
        let shards: Vec<String> = ctx
            .touched_shards()
            .into_iter()
            .map(|s| s.as_str().to_string())
            .collect();
        assert_eq!(shards, vec!["a", "b"]);
    }

    #[test]
    fn test_commit_transition() {
        let mut ctx = TransactionContext::new(TxnId::new(1), 10);
        ctx.mark_validating();
        ctx.mark_committed();
        assert!(ctx.is_committed());
        assert!(ctx.is_terminal());
        assert!(ctx.ensure_active().is_err());
    }

    #[test]
    fn test_validating_blocks_operations_but_is_not_terminal() {
        let mut ctx = TransactionContext::new(TxnId::new(1), 10);
        ctx.mark_validating();
        assert!(!ctx.is_terminal());
        let err = ctx.ensure_active().unwrap_err();
        match err {
            Error::InvalidState { status, .. } => assert!(status.contains("Validating")),
            _ => panic!("Wrong error variant"),
        }
        ctx.mark_aborted("conflict");
        assert!(ctx.is_terminal());
    }

    #[test]
    fn test_elapsed_moves_forward() {
        let ctx = TransactionContext::new(TxnId::new(1), 10);
        let first = ctx.elapsed();
        assert!(ctx.elapsed() >= first);
    }

    #[test]
    fn test_abort_discards_writes_keeps_reads() {
        let mut ctx = TransactionContext::new(TxnId::new(1), 10);
        let (s, k) = pair("s", "x");
        ctx.record_read(s.clone(), k.clone(), 3);
        ctx.stage(s, k, Mutation::Tombstone);
        ctx.mark_aborted("conflict");
        assert_eq!(ctx.write_count(), 0);
        assert_eq!(ctx.read_count(), 1);
        assert_eq!(ctx.abort_reason(), Some("conflict"));
    }

    #[test]
    fn test_ensure_active_error_carries_status() {
        let mut ctx = TransactionContext::new(TxnId::new(5), 10);
        ctx.mark_aborted("rolled back");
        let err = ctx.ensure_active().unwrap_err();
        match err {
            Error::InvalidState { txn, status } => {
                assert_eq!(txn, TxnId::new(5));
                assert!(status.contains("Aborted"));
            }
            _ => panic!("Wrong error variant"),
        }
    }
}
