//! Core types and traits for ShardTx
//!
//! This crate defines the foundational types used throughout the system:
//! - TxnId: Unique identifier for transactions
//! - ShardId: Identifier for an independently lockable partition of the key space
//! - Key: Opaque string key, unique within a shard
//! - Value / Mutation: Byte payloads and tombstones
//! - VersionRecord: One entry in a key's append-only version history
//! - Error: Error type hierarchy
//! - ShardBackend: The storage interface shards implement
//! - Limits: Configurable ceilings enforced by the transaction manager

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod traits;
pub mod types;
pub mod value;
pub mod version;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use limits::Limits;
pub use traits::ShardBackend;
pub use types::{Key, ShardId, TxnId};
pub use value::{Mutation, Value};
pub use version::{VersionRecord, TS_ABSENT};
