//! Storage layer for ShardTx
//!
//! This crate implements the per-shard versioned store and the shard
//! registry:
//! - VersionChain: append-only per-key history, newest-first
//! - InMemoryShard: `ShardBackend` over a DashMap of version chains
//! - Shard / ShardRegistry: static shard lookup plus per-shard commit locks
//!
//! Snapshot reads never take the commit lock: the append-only chain design
//! lets a reader resolve a past timestamp while strictly newer records are
//! appended concurrently.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod memory;
pub mod registry;

pub use chain::VersionChain;
pub use memory::{InMemoryShard, UnavailableShard};
pub use registry::{Shard, ShardRegistry};
