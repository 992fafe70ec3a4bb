//! Error types for ShardTx
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Note: a write-write conflict is NOT an error. Conflict is a normal,
//! expected outcome of `commit` and is reported through the commit outcome
//! type, so that callers never confuse it with genuine failures like
//! `ShardUnavailable`.

use crate::types::{ShardId, TxnId};
use thiserror::Error;

/// Result type alias for ShardTx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the transaction engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Unknown transaction id
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TxnId),

    /// Unknown shard id
    #[error("Shard not found: {0}")]
    ShardNotFound(ShardId),

    /// Operation attempted on a transaction that is not Active
    #[error("Transaction {txn} is not active: {status}")]
    InvalidState {
        /// The transaction the operation targeted
        txn: TxnId,
        /// The terminal status the transaction was found in
        status: String,
    },

    /// An underlying shard call failed or timed out
    ///
    /// Retryable from the caller's perspective: the engine guarantees no
    /// shard observed any of the failed transaction's writes.
    #[error("Shard {shard} unavailable: {reason}")]
    ShardUnavailable {
        /// The shard whose backend call failed
        shard: ShardId,
        /// Backend-provided failure description
        reason: String,
    },

    /// Configured ceiling on concurrent transactions reached
    #[error("Transaction limit exceeded: {active} active, limit {limit}")]
    LimitExceeded {
        /// Number of currently active transactions
        active: usize,
        /// Configured maximum
        limit: usize,
    },
}

impl Error {
    /// Attribute a backend failure to a shard
    ///
    /// Backend calls surface as `ShardUnavailable` at the public boundary;
    /// errors that already carry a shard pass through unchanged.
    pub fn into_unavailable(self, shard: &ShardId) -> Error {
        match self {
            e @ Error::ShardUnavailable { .. } => e,
            other => Error::ShardUnavailable {
                shard: shard.clone(),
                reason: other.to_string(),
            },
        }
    }
}
