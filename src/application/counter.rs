//! Sliding window counts over the ledger.
//!
//! Counting re-checks every timestamp against the window boundary, so the
//! result is the same whether or not a prune has physically removed expired
//! events yet.

use crate::application::ledger::{AccessLedger, LedgerStorage, Timeline};
use crate::application::ports::Storage;
use crate::domain::identity::{Bucket, Identity};
use crate::domain::window::{Window, WindowCounts};

/// Counts events per window for one bucket.
#[derive(Debug, Clone)]
pub struct WindowCounter<S = LedgerStorage>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    ledger: AccessLedger<S>,
}

impl<S> WindowCounter<S>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    /// Create a counter reading from `ledger`.
    pub fn new(ledger: AccessLedger<S>) -> Self {
        Self { ledger }
    }

    /// Number of events for `identity` with `timestamp > now - window`.
    ///
    /// `None` counts the global bucket.
    pub fn count(&self, identity: Option<&Identity>, window: Window, now: u64) -> u64 {
        self.ledger
            .with_timeline(identity, |timeline| {
                timeline
                    .iter()
                    .filter(|&&ts| window.contains(ts, now))
                    .count() as u64
            })
            .unwrap_or(0)
    }

    /// Counts for all three windows, taken in a single pass under one lock.
    pub fn counts(&self, identity: Option<&Identity>, now: u64) -> WindowCounts {
        self.ledger
            .with_timeline(identity, |timeline| {
                let mut counts = WindowCounts::default();
                for &ts in timeline {
                    counts.tally(ts, now);
                }
                counts
            })
            .unwrap_or_default()
    }

    /// The ledger being counted.
    pub fn ledger(&self) -> &AccessLedger<S> {
        &self.ledger
    }
}
