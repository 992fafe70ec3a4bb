//! Commit-time validation
//!
//! Conflict detection is write-write only, routed through read baselines:
//! every read set entry is re-checked against the shard's current latest
//! commit_ts under the held commit lock. Transactions that only read
//! overlapping keys never conflict with each other, and write skew is
//! allowed by design.

use shardtx_core::{Key, Result, ShardId, TS_ABSENT};
use shardtx_storage::Shard;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One stale read detected during validation
///
/// The pair was observed at `observed_ts` when read, but a conflicting
/// commit has since moved the key to `latest_ts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Shard holding the key
    pub shard: ShardId,
    /// The contended key
    pub key: Key,
    /// commit_ts recorded in the read set (0 = key was absent)
    pub observed_ts: u64,
    /// Current latest commit_ts at validation time (0 = key now absent)
    pub latest_ts: u64,
}

/// Result of validating a transaction's read set
///
/// Accumulates every stale read rather than stopping at the first, so an
/// aborted caller can see the full contention picture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// All conflicts detected
    pub conflicts: Vec<Conflict>,
}

impl ValidationResult {
    /// A passing result with no conflicts
    pub fn ok() -> Self {
        Self::default()
    }

    /// Whether validation passed
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of conflicts found
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Re-check every read set entry against the current shard state
///
/// Must be called with every shard in `shards` commit-locked by the caller;
/// otherwise a conflicting commit could land between this check and the
/// apply phase.
///
/// Backend failures abort validation immediately: a commit must never be
/// decided against a shard we could not reach.
pub fn validate_read_set(
    read_set: &BTreeMap<(ShardId, Key), u64>,
    shards: &BTreeMap<ShardId, Arc<Shard>>,
) -> Result<ValidationResult> {
    let mut result = ValidationResult::ok();

    for ((shard_id, key), observed_ts) in read_set {
        let shard = &shards[shard_id];
        let latest_ts = shard
            .backend()
            .latest_commit_ts(key)
            .map_err(|e| e.into_unavailable(shard_id))?
            .unwrap_or(TS_ABSENT);

        if latest_ts != *observed_ts {
            result.conflicts.push(Conflict {
                shard: shard_id.clone(),
                key: key.clone(),
                observed_ts: *observed_ts,
                latest_ts,
            });
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardtx_core::{Mutation, ShardBackend, Value};
    use shardtx_storage::{InMemoryShard, ShardRegistry};

    fn setup(names: &[&str]) -> (ShardRegistry, BTreeMap<ShardId, Arc<Shard>>) {
        let reg = ShardRegistry::in_memory(names.iter().map(|n| ShardId::from(*n)));
        let shards = names
            .iter()
            .map(|n| {
                let id = ShardId::from(*n);
                (id.clone(), Arc::clone(reg.get(&id).unwrap()))
            })
            .collect();
        (reg, shards)
    }

    fn read_set(entries: &[(&str, &str, u64)]) -> BTreeMap<(ShardId, Key), u64> {
        entries
            .iter()
            .map(|(s, k, ts)| ((ShardId::from(*s), Key::from(*k)), *ts))
            .collect()
    }

    #[test]
    fn test_empty_read_set_is_valid() {
        let (_reg, shards) = setup(&["s"]);
        let result = validate_read_set(&BTreeMap::new(), &shards).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_unchanged_read_is_valid() {
        let (reg, shards) = setup(&["s"]);
        let backend = reg.get(&ShardId::from("s")).unwrap().backend().clone();
        backend
            .apply(Key::from("x"), Mutation::Put(Value::from("v")), 3)
            .unwrap();

        let result = validate_read_set(&read_set(&[("s", "x", 3)]), &shards).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_stale_read_conflicts() {
        let (reg, shards) = setup(&["s"]);
        let backend = reg.get(&ShardId::from("s")).unwrap().backend().clone();
        backend
            .apply(Key::from("x"), Mutation::Put(Value::from("v")), 3)
            .unwrap();
        backend
            .apply(Key::from("x"), Mutation::Put(Value::from("w")), 5)
            .unwrap();

        let result = validate_read_set(&read_set(&[("s", "x", 3)]), &shards).unwrap();
        assert_eq!(result.conflict_count(), 1);
        assert_eq!(
            result.conflicts[0],
            Conflict {
                shard: ShardId::from("s"),
                key: Key::from("x"),
                observed_ts: 3,
                latest_ts: 5,
            }
        );
    }

    #[test]
    fn test_absent_then_created_conflicts() {
        let (reg, shards) = setup(&["s"]);
        let backend = reg.get(&ShardId::from("s")).unwrap().backend().clone();
        // Read observed the key as absent (ts 0), then someone created it
        backend
            .apply(Key::from("x"), Mutation::Put(Value::from("v")), 4)
            .unwrap();

        let result = validate_read_set(&read_set(&[("s", "x", 0)]), &shards).unwrap();
        assert_eq!(result.conflict_count(), 1);
        assert_eq!(result.conflicts[0].latest_ts, 4);
    }

    #[test]
    fn test_absent_still_absent_is_valid() {
        let (_reg, shards) = setup(&["s"]);
        let result = validate_read_set(&read_set(&[("s", "x", 0)]), &shards).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn test_all_conflicts_accumulated() {
        let (reg, shards) = setup(&["a", "b"]);
        let a = reg.get(&ShardId::from("a")).unwrap().backend().clone();
        let b = reg.get(&ShardId::from("b")).unwrap().backend().clone();
        a.apply(Key::from("x"), Mutation::Put(Value::from("v")), 2)
            .unwrap();
        b.apply(Key::from("y"), Mutation::Tombstone, 3).unwrap();

        let result =
            validate_read_set(&read_set(&[("a", "x", 1), ("b", "y", 1)]), &shards).unwrap();
        assert_eq!(result.conflict_count(), 2);
    }

    #[test]
    fn test_backend_failure_propagates() {
        let backend: Arc<dyn ShardBackend> =
            Arc::new(shardtx_storage::memory::UnavailableShard::new(ShardId::from("s")));
        let reg = ShardRegistry::new([(ShardId::from("s"), backend)]);
        let shards: BTreeMap<_, _> = [(
            ShardId::from("s"),
            Arc::clone(reg.get(&ShardId::from("s")).unwrap()),
        )]
        .into_iter()
        .collect();

        let err = validate_read_set(&read_set(&[("s", "x", 0)]), &shards);
        assert!(err.is_err());
    }

    #[test]
    fn test_in_memory_used_as_trait() {
        // Validation only goes through the ShardBackend trait
        let backend: Arc<dyn ShardBackend> = Arc::new(InMemoryShard::new());
        assert!(backend.latest_commit_ts(&Key::from("x")).unwrap().is_none());
    }
}
