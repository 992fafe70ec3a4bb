//! Configurable limits
//!
//! Limits are enforced by the transaction manager. Violations return
//! `LimitExceeded`; nothing is ever silently truncated or queued.

/// Ceilings enforced by the transaction manager
///
/// Custom limits are set at manager construction time and are fixed for
/// the manager's lifetime.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum number of concurrently Active transactions (default: 1024)
    ///
    /// Terminal (Committed/Aborted) transactions retained in the table for
    /// strict double-commit detection do not count against this limit.
    pub max_active_transactions: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_active_transactions: 1024,
        }
    }
}

impl Limits {
    /// Limits with a specific active-transaction ceiling
    pub fn with_max_active(max_active_transactions: usize) -> Self {
        Limits {
            max_active_transactions,
        }
    }
}
