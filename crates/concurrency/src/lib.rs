//! Concurrency layer for ShardTx
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - Clock: process-wide source of snapshot and commit timestamps
//! - TransactionContext: read/write set tracking with snapshot isolation
//! - Conflict detection at commit time (write-write, via read baselines)
//! - TransactionManager: begin/read/write/commit/rollback and the
//!   validate-then-apply commit protocol across shards
//!
//! The isolation level is snapshot isolation, not serializability: two
//! transactions that read each other's inputs but write disjoint keys may
//! both commit (write skew is permitted).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod manager;
pub mod transaction;
pub mod validation;

pub use clock::Clock;
pub use manager::{CommitOutcome, TransactionManager};
pub use transaction::{TransactionContext, TransactionStatus};
pub use validation::{Conflict, ValidationResult};
