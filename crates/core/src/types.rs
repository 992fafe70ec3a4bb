//! Identifier types for ShardTx
//!
//! - TxnId: transaction identifier, allocated from an atomic counter
//! - ShardId: names an independently lockable, independently versioned shard
//! - Key: opaque string key, unique within a shard

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a transaction
///
/// TxnIds are allocated by the transaction manager from a monotonically
/// increasing counter. They are unique for the lifetime of a manager
/// instance and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxnId(u64);

impl TxnId {
    /// Create a TxnId from a raw counter value
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw counter value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Identifier for a shard
///
/// A shard is an independently lockable partition of the key space.
/// ShardIds have a total order; the commit protocol acquires shard locks
/// in ascending ShardId order, which makes deadlock structurally impossible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(String);

impl ShardId {
    /// Create a new ShardId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the shard name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ShardId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ShardId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque string key, unique within a shard
///
/// Cross-shard uniqueness is not required: the same Key may exist in
/// several shards with unrelated version histories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(String);

impl Key {
    /// Create a new Key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}
