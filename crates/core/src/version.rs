//! Version records
//!
//! A key's history is an ordered sequence of VersionRecords strictly
//! increasing in `commit_ts`. The history is append-only: no record is
//! mutated or removed except by an explicit garbage-collection pass or by
//! the manager unwinding a failed apply while the shard locks are held.
//!
//! Commit timestamp 0 is reserved: it is never assigned by the clock, so
//! "observed commit_ts 0" unambiguously means the key was absent.

use crate::value::{Mutation, Value};
use serde::{Deserialize, Serialize};

/// Commit timestamp reserved for "key was absent when read"
pub const TS_ABSENT: u64 = 0;

/// One entry in a key's version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// The committed mutation (value or tombstone)
    pub mutation: Mutation,
    /// Timestamp assigned by the clock when this record was committed
    pub commit_ts: u64,
}

impl VersionRecord {
    /// Create a record carrying a value
    pub fn put(value: Value, commit_ts: u64) -> Self {
        Self {
            mutation: Mutation::Put(value),
            commit_ts,
        }
    }

    /// Create a tombstone record
    pub fn tombstone(commit_ts: u64) -> Self {
        Self {
            mutation: Mutation::Tombstone,
            commit_ts,
        }
    }

    /// Whether this record marks a deletion
    pub fn is_tombstone(&self) -> bool {
        self.mutation.is_tombstone()
    }

    /// The value visible at this record, or None for a tombstone
    pub fn value(&self) -> Option<&Value> {
        self.mutation.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_record() {
        let rec = VersionRecord::put(Value::from("v1"), 3);
        assert_eq!(rec.commit_ts, 3);
        assert!(!rec.is_tombstone());
        assert_eq!(rec.value(), Some(&Value::from("v1")));
    }

    #[test]
    fn test_tombstone_record() {
        let rec = VersionRecord::tombstone(7);
        assert_eq!(rec.commit_ts, 7);
        assert!(rec.is_tombstone());
        assert_eq!(rec.value(), None);
    }

    #[test]
    fn test_ts_absent_is_zero() {
        // The clock starts at 1 for commits, so 0 can only mean "absent".
        assert_eq!(TS_ABSENT, 0);
    }
}
