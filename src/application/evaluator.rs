//! Quota evaluation.
//!
//! Compares window counts against thresholds and produces a `Decision`. The
//! verdict is a conjunction of independent checks; the first violation found
//! (per-identity minute, hour, day, then aggregate minute, hour, day) is the
//! one reported.

use crate::application::counter::WindowCounter;
use crate::application::ledger::{LedgerStorage, Timeline};
use crate::application::ports::Storage;
use crate::domain::access::{AccessLists, Standing};
use crate::domain::decision::{Decision, Violation};
use crate::domain::identity::{Bucket, Identity};
use crate::domain::quota::{QuotaConfig, Thresholds};
use crate::domain::window::{Window, WindowCounts};

/// Evaluates recorded traffic against a quota configuration.
///
/// Has no side effects: evaluating twice against the same ledger state
/// yields the same decision.
#[derive(Debug, Clone)]
pub struct QuotaEvaluator<S = LedgerStorage>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    counter: WindowCounter<S>,
    lists: AccessLists,
}

impl<S> QuotaEvaluator<S>
where
    S: Storage<Bucket, Timeline> + Clone,
{
    /// Create an evaluator with empty access lists.
    pub fn new(counter: WindowCounter<S>) -> Self {
        Self {
            counter,
            lists: AccessLists::default(),
        }
    }

    /// Apply exempt and blocked identity lists.
    pub fn with_access_lists(mut self, lists: AccessLists) -> Self {
        self.lists = lists;
        self
    }

    /// Evaluate `identity`'s traffic at `now` against `config`.
    ///
    /// Anonymous callers (`None`) are held to the per-identity thresholds
    /// against the global bucket. Aggregate counts are reported only when
    /// `config.limit_all_traffic` is set.
    pub fn evaluate(&self, identity: Option<&Identity>, now: u64, config: &QuotaConfig) -> Decision {
        let per_identity = self.counter.counts(identity, now);
        let aggregate = if config.limit_all_traffic {
            Some(self.counter.counts(None, now))
        } else {
            None
        };

        let violation = match self.lists.standing(identity) {
            Standing::Blocked => Some(Violation::Blocked),
            Standing::Exempt => None,
            Standing::Regular => first_violation(&config.per_identity, &per_identity)
                .map(Violation::PerIdentity)
                .or_else(|| {
                    aggregate.as_ref().and_then(|counts| {
                        first_violation(&config.aggregate, counts).map(Violation::Aggregate)
                    })
                }),
        };

        match violation {
            Some(violation) => Decision::deny(violation, per_identity, aggregate),
            None => Decision::allow(per_identity, aggregate),
        }
    }

    /// The counter this evaluator reads from.
    pub fn counter(&self) -> &WindowCounter<S> {
        &self.counter
    }

    /// The access lists in force.
    pub fn access_lists(&self) -> &AccessLists {
        &self.lists
    }
}

fn first_violation(thresholds: &Thresholds, counts: &WindowCounts) -> Option<Window> {
    Window::ALL
        .into_iter()
        .find(|&window| thresholds.exceeded_by(window, counts.get(window)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ledger::AccessLedger;
    use crate::domain::decision::Verdict;

    const SECOND: u64 = 1_000;

    fn scenario_config() -> QuotaConfig {
        QuotaConfig::per_identity(Thresholds::new(1, 12, 30), Thresholds::new(2, 2, 2))
    }

    fn evaluator() -> (AccessLedger, QuotaEvaluator) {
        let ledger = AccessLedger::new();
        let evaluator = QuotaEvaluator::new(WindowCounter::new(ledger.clone()));
        (ledger, evaluator)
    }

    #[test]
    fn test_within_limits_allows() {
        let (ledger, evaluator) = evaluator();
        let a = Identity::new("A");
        ledger.record(Some(&a), 0);

        let decision = evaluator.evaluate(Some(&a), 0, &scenario_config());

        assert_eq!(decision.verdict, Verdict::Allow);
        assert_eq!(decision.per_identity, WindowCounts::new(1, 1, 1));
        assert_eq!(decision.aggregate, None);
    }

    #[test]
    fn test_minute_violation_reported_first() {
        let (ledger, evaluator) = evaluator();
        let a = Identity::new("A");
        ledger.record(Some(&a), 0);
        ledger.record(Some(&a), 5 * SECOND);

        let decision = evaluator.evaluate(Some(&a), 5 * SECOND, &scenario_config());

        assert_eq!(decision.verdict, Verdict::Deny);
        assert_eq!(decision.violation, Some(Violation::PerIdentity(Window::Minute)));
    }

    #[test]
    fn test_hour_violation_after_minute_clears() {
        let (ledger, evaluator) = evaluator();
        let a = Identity::new("A");
        // 13 requests, two minutes apart
        for i in 0..13 {
            ledger.record(Some(&a), i * 120 * SECOND);
        }
        let now = 12 * 120 * SECOND;

        let decision = evaluator.evaluate(Some(&a), now, &scenario_config());

        assert_eq!(decision.violation, Some(Violation::PerIdentity(Window::Hour)));
        assert_eq!(decision.per_identity.minute, 1);
        assert_eq!(decision.per_identity.hour, 13);
    }

    #[test]
    fn test_aggregate_ignored_when_disabled() {
        let (ledger, evaluator) = evaluator();
        for i in 0..50 {
            ledger.record(Some(&Identity::new(format!("c{}", i))), 0);
        }

        // Aggregate threshold is 2, but limit_all_traffic is false
        let decision = evaluator.evaluate(Some(&Identity::new("c0")), 0, &scenario_config());

        assert!(decision.is_allowed());
        assert_eq!(decision.aggregate, None);
    }

    #[test]
    fn test_aggregate_enforced_when_enabled() {
        let (ledger, evaluator) = evaluator();
        for i in 0..3 {
            ledger.record(Some(&Identity::new(format!("c{}", i))), 0);
        }
        let config = QuotaConfig::with_aggregate(Thresholds::new(1, 12, 30), Thresholds::new(2, 100, 100));

        let decision = evaluator.evaluate(Some(&Identity::new("c2")), 0, &config);

        assert_eq!(decision.violation, Some(Violation::Aggregate(Window::Minute)));
        assert_eq!(decision.aggregate, Some(WindowCounts::new(3, 3, 3)));
        assert_eq!(decision.per_identity, WindowCounts::new(1, 1, 1));
    }

    #[test]
    fn test_anonymous_uses_global_bucket() {
        let (ledger, evaluator) = evaluator();
        ledger.record(Some(&Identity::new("A")), 0);
        ledger.record(None, 0);

        let decision = evaluator.evaluate(None, 0, &scenario_config());

        assert_eq!(decision.per_identity.minute, 2);
        assert_eq!(decision.violation, Some(Violation::PerIdentity(Window::Minute)));
    }

    #[test]
    fn test_zero_threshold_denies_first_request() {
        let (ledger, evaluator) = evaluator();
        let a = Identity::new("A");
        ledger.record(Some(&a), 0);
        let config = QuotaConfig::per_identity(Thresholds::new(0, 10, 10), Thresholds::new(0, 0, 0));

        assert!(!evaluator.evaluate(Some(&a), 0, &config).is_allowed());
    }

    #[test]
    fn test_access_lists_override_quotas() {
        let (ledger, evaluator) = evaluator();
        let evaluator = evaluator.with_access_lists(
            AccessLists::new()
                .with_exempt([Identity::new("trusted")])
                .with_blocked([Identity::new("banned")]),
        );
        let trusted = Identity::new("trusted");
        let banned = Identity::new("banned");
        for _ in 0..5 {
            ledger.record(Some(&trusted), 0);
        }
        ledger.record(Some(&banned), 0);

        let trusted_decision = evaluator.evaluate(Some(&trusted), 0, &scenario_config());
        assert!(trusted_decision.is_allowed());
        assert_eq!(trusted_decision.per_identity.minute, 5);

        let banned_decision = evaluator.evaluate(Some(&banned), 0, &scenario_config());
        assert_eq!(banned_decision.violation, Some(Violation::Blocked));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let (ledger, evaluator) = evaluator();
        let a = Identity::new("A");
        ledger.record(Some(&a), 0);
        ledger.record(Some(&a), 1);
        let config = scenario_config();

        let first = evaluator.evaluate(Some(&a), 10, &config);
        let second = evaluator.evaluate(Some(&a), 10, &config);

        assert_eq!(first, second);
        assert_eq!(ledger.event_count(), 4);
    }
}
