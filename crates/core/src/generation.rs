//! Generation tickets for discarding results of superseded operations.
//!
//! Every logical operation (e.g. "compare the selected commit pair") takes a
//! ticket before it starts awaiting. When its result arrives, the caller asks
//! whether the ticket is still the newest one; if a later operation has been
//! started in the meantime, the stale result is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque, ordered ticket handed out by a [`GenerationCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// Monotonic counter shared between the operations of one logical stream.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    latest: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new operation, superseding all earlier tickets.
    pub fn next(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` belongs to the most recently started operation.
    pub fn is_current(&self, ticket: Generation) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_ticket_wins() {
        let counter = GenerationCounter::new();
        let first = counter.next();
        assert!(counter.is_current(first));

        let second = counter.next();
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn test_clones_share_state() {
        let counter = GenerationCounter::new();
        let handle = counter.clone();
        let ticket = counter.next();
        handle.next();
        assert!(!counter.is_current(ticket));
    }
}
