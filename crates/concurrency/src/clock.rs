//! Logical clock
//!
//! One allocation counter stamps commits, a separate visibility watermark
//! stamps snapshots. `advance` allocates a commit timestamp before the apply
//! phase begins; the timestamp becomes visible to `now` only once `publish`
//! is called for it, after every record of that commit has landed. The
//! watermark never passes an in-flight allocation, so a snapshot at or above
//! a commit_ts always sees every write of that commit.
//!
//! The counter starts at 0 and the first commit is stamped 1, which keeps
//! commit_ts 0 free to mean "key was absent".

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide monotonic timestamp source
#[derive(Debug, Default)]
pub struct Clock {
    counter: AtomicU64,
    visible: AtomicU64,
    in_flight: Mutex<BTreeSet<u64>>,
}

impl Clock {
    /// Create a clock starting at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current visibility watermark (stamps `snapshot_ts`)
    ///
    /// Every commit with `commit_ts <= now()` has been fully applied.
    #[inline]
    pub fn now(&self) -> u64 {
        self.visible.load(Ordering::SeqCst)
    }

    /// Allocate the next commit timestamp
    ///
    /// Concurrent callers never observe the same value, and values are
    /// monotone in real allocation order. The allocated timestamp stays
    /// invisible to `now` until it is published.
    pub fn advance(&self) -> u64 {
        let mut in_flight = self.in_flight.lock();
        let ts = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        in_flight.insert(ts);
        ts
    }

    /// Mark an allocated timestamp as fully applied
    ///
    /// The watermark moves to the greatest timestamp with no older
    /// allocation still in flight; an out-of-order publish is held back
    /// until the older commits land, then released in one step.
    pub fn publish(&self, ts: u64) {
        let mut in_flight = self.in_flight.lock();
        let removed = in_flight.remove(&ts);
        debug_assert!(removed, "published timestamp {} was never allocated", ts);
        let watermark = match in_flight.iter().next() {
            Some(oldest) => oldest - 1,
            None => self.counter.load(Ordering::SeqCst),
        };
        self.visible.store(watermark, Ordering::SeqCst);
    }
}
