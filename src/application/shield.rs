//! The shield facade.
//!
//! One `AccessShield` guards one logical endpoint. The HTTP layer holds a
//! clone (all state is shared) and calls `check_and_record` once per inbound
//! request.

use crate::application::counter::WindowCounter;
use crate::application::evaluator::QuotaEvaluator;
use crate::application::ledger::{AccessLedger, LedgerStorage, PruneReport, Timeline};
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, QuotaSource, Storage};
use crate::domain::access::AccessLists;
use crate::domain::decision::{Decision, Telemetry};
use crate::domain::identity::{Bucket, Identity};
use crate::domain::quota::ConfigError;
use crate::domain::window::Window;
use crate::infrastructure::clock::SystemClock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Error returned by the shield.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShieldError {
    /// The builder was not given a quota source
    #[error("no quota source configured")]
    MissingQuotaSource,
    /// The quota source could not produce a valid configuration
    #[error("quota configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Builder for constructing an `AccessShield`.
pub struct ShieldBuilder {
    quota_source: Option<Arc<dyn QuotaSource>>,
    clock: Option<Arc<dyn Clock>>,
    lists: AccessLists,
}

impl ShieldBuilder {
    /// Set the source of quota thresholds. Required.
    pub fn with_quota_source(mut self, source: Arc<dyn QuotaSource>) -> Self {
        self.quota_source = Some(source);
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Identities that are recorded but never denied, e.g. the local host.
    pub fn with_exempt_identities(mut self, identities: Vec<Identity>) -> Self {
        self.lists = self.lists.with_exempt(identities);
        self
    }

    /// Identities that are recorded and always denied.
    pub fn with_blocked_identities(mut self, identities: Vec<Identity>) -> Self {
        self.lists = self.lists.with_blocked(identities);
        self
    }

    /// Build the shield.
    ///
    /// The quota source is read once here so that a misconfigured store is
    /// caught at construction rather than on the first request.
    ///
    /// # Errors
    /// Returns `ShieldError::MissingQuotaSource` if no source was set, or
    /// `ShieldError::Config` if the source cannot produce a valid configuration.
    pub fn build(self) -> Result<AccessShield, ShieldError> {
        let quota_source = self.quota_source.ok_or(ShieldError::MissingQuotaSource)?;
        quota_source.quota()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        Ok(AccessShield::assemble(
            AccessLedger::new(),
            quota_source,
            clock,
            self.lists,
        ))
    }
}

/// Multi-window access shield.
///
/// # Example
/// ```
/// use access_shield::{AccessShield, Identity, QuotaConfig, StaticQuotaSource, Thresholds, Verdict};
/// use std::sync::Arc;
///
/// let quota = QuotaConfig::per_identity(Thresholds::new(1, 12, 30), Thresholds::new(100, 1000, 10000));
/// let shield = AccessShield::builder()
///     .with_quota_source(Arc::new(StaticQuotaSource::new(quota)))
///     .build()
///     .unwrap();
///
/// let a = Identity::new("A");
/// assert_eq!(shield.check_and_record(Some(&a), 0).unwrap().verdict, Verdict::Allow);
/// assert_eq!(shield.check_and_record(Some(&a), 5_000).unwrap().verdict, Verdict::Deny);
/// assert_eq!(shield.telemetry(5_000).aggregate.minute, 2);
/// ```
#[derive(Debug, Clone)]
pub struct AccessShield<S = LedgerStorage>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    ledger: AccessLedger<S>,
    evaluator: QuotaEvaluator<S>,
    quota_source: Arc<dyn QuotaSource>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl AccessShield<LedgerStorage> {
    /// Create a builder for configuring the shield.
    ///
    /// Defaults:
    /// - Clock: system wall clock
    /// - Exempt and blocked lists: empty
    ///
    /// There is no default quota source.
    pub fn builder() -> ShieldBuilder {
        ShieldBuilder {
            quota_source: None,
            clock: None,
            lists: AccessLists::default(),
        }
    }
}

impl<S> AccessShield<S>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    /// Create a shield over an existing ledger.
    ///
    /// Use this with custom storage; the builder covers the default case.
    ///
    /// # Errors
    /// Returns `ShieldError::Config` if the quota source cannot produce a
    /// valid configuration.
    pub fn with_ledger(
        ledger: AccessLedger<S>,
        quota_source: Arc<dyn QuotaSource>,
        clock: Arc<dyn Clock>,
        lists: AccessLists,
    ) -> Result<Self, ShieldError> {
        quota_source.quota()?;
        Ok(Self::assemble(ledger, quota_source, clock, lists))
    }

    fn assemble(
        ledger: AccessLedger<S>,
        quota_source: Arc<dyn QuotaSource>,
        clock: Arc<dyn Clock>,
        lists: AccessLists,
    ) -> Self {
        let evaluator =
            QuotaEvaluator::new(WindowCounter::new(ledger.clone())).with_access_lists(lists);
        Self {
            ledger,
            evaluator,
            quota_source,
            clock,
            metrics: Metrics::new(),
        }
    }

    /// Record a request from `identity` at `now` and decide whether to admit it.
    ///
    /// The request is recorded under its identity and under the global bucket
    /// before evaluation, so it counts against its own quota: with a minute
    /// threshold of 1 the first request passes and the second is denied.
    /// Denied requests stay recorded.
    ///
    /// # Errors
    /// Returns `ShieldError::Config` if the quota source cannot produce a
    /// valid configuration. Nothing is recorded in that case.
    pub fn check_and_record(
        &self,
        identity: Option<&Identity>,
        now: u64,
    ) -> Result<Decision, ShieldError> {
        let config = self.quota_source.quota()?;

        self.ledger.record(identity, now);
        self.prune(now);

        let decision = self.evaluator.evaluate(identity, now, &config);
        let who = identity.map(Identity::as_str).unwrap_or("<anonymous>");

        match decision.violation {
            Some(violation) => {
                self.metrics.record_denied();
                warn!(
                    identity = %who,
                    violation = %violation,
                    minute = decision.per_identity.minute,
                    hour = decision.per_identity.hour,
                    day = decision.per_identity.day,
                    "access denied"
                );
            }
            None => {
                self.metrics.record_allowed();
                debug!(
                    identity = %who,
                    minute = decision.per_identity.minute,
                    hour = decision.per_identity.hour,
                    day = decision.per_identity.day,
                    "access allowed"
                );
            }
        }

        Ok(decision)
    }

    /// `check_and_record` at the injected clock's current time.
    pub fn check(&self, identity: Option<&Identity>) -> Result<Decision, ShieldError> {
        self.check_and_record(identity, self.clock.now_millis())
    }

    /// All-traffic counts at `now`, without recording anything.
    ///
    /// Prunes first so the numbers shown reflect expiry.
    pub fn telemetry(&self, now: u64) -> Telemetry {
        self.prune(now);
        Telemetry {
            aggregate: self.evaluator.counter().counts(None, now),
        }
    }

    /// `telemetry` at the injected clock's current time.
    pub fn telemetry_now(&self) -> Telemetry {
        self.telemetry(self.clock.now_millis())
    }

    /// Drop every event that has left the longest window as of `now`.
    pub fn prune(&self, now: u64) -> PruneReport {
        let cutoff = now.saturating_sub(Window::LONGEST.millis());
        let report = self.ledger.prune_older_than(cutoff);

        if !report.is_noop() {
            self.metrics
                .record_prune(report.events_removed, report.buckets_released);
            debug!(
                cutoff,
                events_removed = report.events_removed,
                buckets_released = report.buckets_released,
                "ledger pruned"
            );
        }

        report
    }

    /// Get a reference to the ledger.
    pub fn ledger(&self) -> &AccessLedger<S> {
        &self.ledger
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Get the injected clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of buckets currently tracked, including the global one.
    pub fn bucket_count(&self) -> usize {
        self.ledger.bucket_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::{Verdict, Violation};
    use crate::domain::quota::{QuotaConfig, Thresholds};
    use crate::domain::window::{WindowCounts, DAY_MS, HOUR_MS};
    use crate::infrastructure::config::{SettingsQuotaSource, SharedQuotaSource, StaticQuotaSource};
    use crate::infrastructure::mocks::{MockCaptureLayer, MockClock};
    use std::collections::HashMap;
    use std::time::Duration;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn shield_with(config: QuotaConfig) -> AccessShield {
        AccessShield::builder()
            .with_quota_source(Arc::new(StaticQuotaSource::new(config)))
            .build()
            .unwrap()
    }

    fn scenario() -> AccessShield {
        shield_with(QuotaConfig::per_identity(
            Thresholds::new(1, 12, 30),
            Thresholds::new(1_000, 10_000, 100_000),
        ))
    }

    #[test]
    fn test_builder_requires_quota_source() {
        let result = AccessShield::builder().build();
        assert!(matches!(result, Err(ShieldError::MissingQuotaSource)));
    }

    #[test]
    fn test_builder_rejects_bad_settings() {
        let source = SettingsQuotaSource::from_map(HashMap::new());
        let result = AccessShield::builder()
            .with_quota_source(Arc::new(source))
            .build();

        assert!(matches!(
            result,
            Err(ShieldError::Config(ConfigError::MissingKey(_)))
        ));
    }

    #[test]
    fn test_with_existing_ledger() {
        let ledger = AccessLedger::new();
        ledger.record(Some(&Identity::new("A")), 0);
        let shield = AccessShield::with_ledger(
            ledger.clone(),
            Arc::new(StaticQuotaSource::new(QuotaConfig::per_identity(
                Thresholds::new(1, 12, 30),
                Thresholds::new(100, 100, 100),
            ))),
            Arc::new(SystemClock::new()),
            AccessLists::default(),
        )
        .unwrap();

        let decision = shield.check_and_record(Some(&Identity::new("A")), 1).unwrap();
        assert_eq!(decision.violation, Some(Violation::PerIdentity(Window::Minute)));
        assert_eq!(ledger.event_count(), 4);
    }

    #[test]
    fn test_first_request_allowed_second_denied() {
        let shield = scenario();
        let a = Identity::new("A");

        let first = shield.check_and_record(Some(&a), 0).unwrap();
        assert_eq!(first.verdict, Verdict::Allow);
        assert_eq!(first.per_identity, WindowCounts::new(1, 1, 1));

        let second = shield.check_and_record(Some(&a), 5_000).unwrap();
        assert_eq!(second.verdict, Verdict::Deny);
        assert_eq!(second.per_identity.minute, 2);
    }

    #[test]
    fn test_denied_requests_still_count() {
        let shield = scenario();
        let a = Identity::new("A");
        let b = Identity::new("B");

        shield.check_and_record(Some(&a), 0).unwrap();
        shield.check_and_record(Some(&a), 5_000).unwrap();
        let b_decision = shield.check_and_record(Some(&b), 5_000).unwrap();

        assert!(b_decision.is_allowed());
        assert_eq!(shield.telemetry(5_000).aggregate.minute, 3);
    }

    #[test]
    fn test_telemetry_does_not_record() {
        let shield = scenario();
        shield.check_and_record(Some(&Identity::new("A")), 0).unwrap();

        shield.telemetry(10);
        shield.telemetry(20);

        assert_eq!(shield.telemetry(30).aggregate, WindowCounts::new(1, 1, 1));
    }

    #[test]
    fn test_check_and_record_prunes_expired_events() {
        let shield = scenario();
        let a = Identity::new("A");
        shield.check_and_record(Some(&a), 0).unwrap();

        shield
            .check_and_record(Some(&Identity::new("B")), DAY_MS + 1)
            .unwrap();

        // A's bucket emptied and released; B and global remain
        assert_eq!(shield.bucket_count(), 2);
        assert_eq!(shield.ledger().snapshot(Some(&a), 0), 0);
        assert_eq!(shield.metrics().events_pruned(), 2);
        assert_eq!(shield.metrics().buckets_released(), 1);
    }

    #[test]
    fn test_config_error_records_nothing() {
        let mut settings = HashMap::new();
        for (k, v) in [
            ("shield.perIdentity.minute", "1"),
            ("shield.perIdentity.hour", "12"),
            ("shield.perIdentity.day", "30"),
            ("shield.aggregate.minute", "1"),
            ("shield.aggregate.hour", "1"),
            ("shield.aggregate.day", "1"),
            ("shield.limitAllTraffic", "false"),
        ] {
            settings.insert(k.to_string(), v.to_string());
        }
        let store = Arc::new(std::sync::RwLock::new(settings));
        let lookup_store = Arc::clone(&store);
        let source = SettingsQuotaSource::new(Arc::new(move |key: &str| {
            lookup_store.read().unwrap().get(key).cloned()
        }));
        let shield = AccessShield::builder()
            .with_quota_source(Arc::new(source))
            .build()
            .unwrap();

        store
            .write()
            .unwrap()
            .insert("shield.perIdentity.hour".to_string(), "".to_string());

        let result = shield.check_and_record(Some(&Identity::new("A")), 0);
        assert!(matches!(
            result,
            Err(ShieldError::Config(ConfigError::InvalidValue { .. }))
        ));
        assert_eq!(shield.ledger().event_count(), 0);
    }

    #[test]
    fn test_quota_read_fresh_each_call() {
        let source = SharedQuotaSource::new(QuotaConfig::per_identity(
            Thresholds::new(1, 100, 100),
            Thresholds::new(100, 100, 100),
        ));
        let shield = AccessShield::builder()
            .with_quota_source(Arc::new(source.clone()))
            .build()
            .unwrap();
        let a = Identity::new("A");

        shield.check_and_record(Some(&a), 0).unwrap();
        assert!(!shield.check_and_record(Some(&a), 1).unwrap().is_allowed());

        source.update(QuotaConfig::per_identity(
            Thresholds::new(10, 100, 100),
            Thresholds::new(100, 100, 100),
        ));
        assert!(shield.check_and_record(Some(&a), 2).unwrap().is_allowed());
    }

    #[test]
    fn test_check_uses_injected_clock() {
        let clock = Arc::new(MockClock::new(0));
        let shield = AccessShield::builder()
            .with_quota_source(Arc::new(StaticQuotaSource::new(QuotaConfig::per_identity(
                Thresholds::new(1, 100, 100),
                Thresholds::new(100, 100, 100),
            ))))
            .with_clock(clock.clone())
            .build()
            .unwrap();
        let a = Identity::new("A");

        assert!(shield.check(Some(&a)).unwrap().is_allowed());
        assert!(!shield.check(Some(&a)).unwrap().is_allowed());

        clock.advance(Duration::from_secs(60));
        assert!(shield.check(Some(&a)).unwrap().is_allowed());
        assert_eq!(shield.telemetry_now().aggregate.minute, 1);
        assert_eq!(shield.telemetry_now().aggregate.hour, 3);
    }

    #[test]
    fn test_blocked_and_exempt_identities() {
        let shield = AccessShield::builder()
            .with_quota_source(Arc::new(StaticQuotaSource::new(QuotaConfig::per_identity(
                Thresholds::new(1, 1, 1),
                Thresholds::new(1, 1, 1),
            ))))
            .with_exempt_identities(vec![Identity::new("127.0.0.1")])
            .with_blocked_identities(vec![Identity::new("10.6.6.6")])
            .build()
            .unwrap();
        let local = Identity::new("127.0.0.1");
        let banned = Identity::new("10.6.6.6");

        for t in 0..5 {
            assert!(shield.check_and_record(Some(&local), t).unwrap().is_allowed());
        }
        let denied = shield.check_and_record(Some(&banned), 10).unwrap();
        assert_eq!(denied.violation, Some(Violation::Blocked));
        assert_eq!(shield.telemetry(10).aggregate.minute, 6);
    }

    #[test]
    fn test_metrics_track_verdicts() {
        let shield = scenario();
        let a = Identity::new("A");
        for t in 0..4 {
            shield.check_and_record(Some(&a), t).unwrap();
        }

        let snapshot = shield.metrics().snapshot();
        assert_eq!(snapshot.requests_allowed, 1);
        assert_eq!(snapshot.requests_denied, 3);
    }

    #[test]
    fn test_denial_logged_with_identity() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let shield = scenario();
        let a = Identity::new("10.0.0.1");

        tracing::subscriber::with_default(subscriber, || {
            shield.check_and_record(Some(&a), 0).unwrap();
            shield.check_and_record(Some(&a), 1).unwrap();
        });

        let warnings = capture.at_level(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "access denied");
        assert_eq!(warnings[0].field("identity"), Some("10.0.0.1"));
        assert_eq!(warnings[0].field("violation"), Some("per-identity minute quota exceeded"));
        assert_eq!(warnings[0].field("minute"), Some("2"));
    }

    #[test]
    fn test_prune_logged_at_debug() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let shield = scenario();

        tracing::subscriber::with_default(subscriber, || {
            shield.check_and_record(None, 0).unwrap();
            shield.telemetry(DAY_MS + HOUR_MS);
        });

        let pruned: Vec<_> = capture
            .at_level(Level::DEBUG)
            .into_iter()
            .filter(|e| e.message == "ledger pruned")
            .collect();
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].field("events_removed"), Some("1"));
    }
}
