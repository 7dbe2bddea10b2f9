//! The access ledger: per-bucket sequences of access timestamps.
//!
//! Each identity owns a bucket and one reserved bucket receives every access.
//! Sequences keep insertion order, which under concurrent appends is not
//! necessarily time order; nothing here or in the counter assumes sortedness.

use crate::application::ports::Storage;
use crate::domain::identity::{AccessEvent, Bucket, Identity};
use crate::infrastructure::storage::ShardedStorage;
use std::sync::Arc;
use tracing::trace;

/// Timestamps recorded for one bucket, in insertion order.
pub type Timeline = Vec<u64>;

/// Default storage backing a ledger.
pub type LedgerStorage = Arc<ShardedStorage<Bucket, Timeline>>;

/// Result of one prune pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Events removed across all buckets
    pub events_removed: u64,
    /// Buckets removed because they became empty
    pub buckets_released: u64,
}

impl PruneReport {
    /// Check if the pass changed anything.
    pub fn is_noop(&self) -> bool {
        self.events_removed == 0 && self.buckets_released == 0
    }
}

/// Append-only record of accesses, keyed by bucket.
///
/// Generic over the storage implementation; in production use the default
/// `Arc<ShardedStorage>`, which lets appends for different identities proceed
/// on different shard locks. Appends, prunes and reads on the same bucket are
/// serialised by that bucket's shard lock.
#[derive(Debug, Clone)]
pub struct AccessLedger<S = LedgerStorage>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    storage: S,
}

impl AccessLedger<LedgerStorage> {
    /// Create an empty ledger on sharded storage.
    pub fn new() -> Self {
        Self::with_storage(Arc::new(ShardedStorage::new()))
    }
}

impl Default for AccessLedger<LedgerStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> AccessLedger<S>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    /// Create a ledger on custom storage.
    pub fn with_storage(storage: S) -> Self {
        Self { storage }
    }

    /// Record one access.
    ///
    /// The event is appended to the identity's bucket and, separately, to the
    /// global bucket. An anonymous access (`None`) is appended once, to the
    /// global bucket only.
    pub fn record(&self, identity: Option<&Identity>, timestamp: u64) {
        if let Some(id) = identity {
            self.append(Bucket::Identity(id.clone()), timestamp);
        }
        self.append(Bucket::Global, timestamp);
        trace!(identity = ?identity.map(Identity::as_str), timestamp, "access recorded");
    }

    /// Record an `AccessEvent`.
    pub fn record_event(&self, event: &AccessEvent) {
        self.record(event.identity.as_ref(), event.timestamp);
    }

    fn append(&self, bucket: Bucket, timestamp: u64) {
        self.storage
            .with_entry_mut(bucket, Timeline::new, |timeline| timeline.push(timestamp));
    }

    /// Count events in a bucket with `timestamp >= since`.
    ///
    /// `None` selects the global bucket. Does not mutate the ledger.
    pub fn snapshot(&self, identity: Option<&Identity>, since: u64) -> u64 {
        self.with_timeline(identity, |timeline| {
            timeline.iter().filter(|&&ts| ts >= since).count() as u64
        })
        .unwrap_or(0)
    }

    /// Run `f` over a bucket's timeline while holding its lock.
    ///
    /// Returns `None` if the bucket does not exist.
    pub(crate) fn with_timeline<F, R>(&self, identity: Option<&Identity>, f: F) -> Option<R>
    where
        F: FnOnce(&[u64]) -> R,
    {
        self.storage
            .with_entry(&Bucket::of(identity), |timeline| f(timeline.as_slice()))
    }

    /// Remove every event with `timestamp < cutoff`, in every bucket.
    ///
    /// Buckets left empty are dropped from the map. Idempotent, and safe to
    /// run concurrently with `record` and with itself.
    pub fn prune_older_than(&self, cutoff: u64) -> PruneReport {
        let mut report = PruneReport::default();

        self.storage.retain(|_bucket, timeline| {
            let before = timeline.len();
            timeline.retain(|&ts| ts >= cutoff);
            report.events_removed += (before - timeline.len()) as u64;

            if timeline.is_empty() {
                report.buckets_released += 1;
                false
            } else {
                true
            }
        });

        report
    }

    /// Number of buckets currently held, including the global one.
    pub fn bucket_count(&self) -> usize {
        self.storage.len()
    }

    /// Total number of events held across all buckets.
    pub fn event_count(&self) -> usize {
        let mut total = 0;
        self.storage.for_each(|_, timeline| total += timeline.len());
        total
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.storage.clear();
    }
}
