//! Periodic pruning of the ledger.
//!
//! `check_and_record` and `telemetry` already prune on every call. The
//! scheduler covers quiet periods, releasing memory held by callers who
//! stopped sending traffic.

use crate::application::ledger::{PruneReport, Timeline};
use crate::application::ports::Storage;
use crate::application::shield::AccessShield;
use crate::domain::identity::Bucket;
use crate::domain::quota::ConfigError;
use std::time::Duration;

#[cfg(feature = "async")]
use thiserror::Error;
#[cfg(feature = "async")]
use tokio::{sync::oneshot, task::JoinHandle, time::interval};

/// Default interval between background prunes.
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Prunes a shield's ledger on a fixed interval.
#[derive(Debug)]
pub struct PruneScheduler<S>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    shield: AccessShield<S>,
    interval: Duration,
}

impl<S> PruneScheduler<S>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    /// Create a scheduler for `shield`.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroPruneInterval` if `interval` is zero.
    pub fn new(shield: AccessShield<S>, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroPruneInterval);
        }
        Ok(Self { shield, interval })
    }

    /// Run one prune at the shield clock's current time.
    pub fn prune_once(&self) -> PruneReport {
        self.shield.prune(self.shield.clock().now_millis())
    }

    /// Get the configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start pruning in a background task.
    ///
    /// Must be called from within a tokio runtime. The first prune runs
    /// immediately.
    #[cfg(feature = "async")]
    pub fn start(self) -> PrunerHandle
    where
        S: Send + Sync + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let join = tokio::spawn(async move {
            let mut ticker = interval(self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.prune_once();
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("pruner stopped");
                        break;
                    }
                }
            }
        });

        PrunerHandle {
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
        }
    }
}

/// Error returned when the pruning task does not stop cleanly.
#[cfg(feature = "async")]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShutdownError {
    /// The task panicked while pruning
    #[error("pruner task panicked: {0}")]
    TaskPanicked(String),
    /// The task was cancelled before it could stop
    #[error("pruner task was cancelled")]
    TaskCancelled,
}

/// Handle to a running pruning task.
///
/// Dropping the handle without calling `shutdown` aborts the task.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct PrunerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

#[cfg(feature = "async")]
impl PrunerHandle {
    /// Signal the task to stop and wait for it to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was cancelled.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The receiver is gone only if the task already ended
            let _ = tx.send(());
        }

        match self.join.take() {
            Some(join) => join.await.map_err(|e| {
                if e.is_panic() {
                    ShutdownError::TaskPanicked(e.to_string())
                } else {
                    ShutdownError::TaskCancelled
                }
            }),
            None => Ok(()),
        }
    }

    /// Check if the task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

#[cfg(feature = "async")]
impl Drop for PrunerHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}
