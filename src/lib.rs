//! # access-shield
//!
//! Multi-window sliding-window admission control for a shared, expensive
//! endpoint.
//!
//! Every inbound request is recorded with its caller identity (typically the
//! client address) and checked against thresholds over three trailing windows:
//! one minute, one hour and one day. A request passes only if the caller is
//! within all three. Optionally, total traffic across all callers is held to a
//! separate set of thresholds.
//!
//! ## Quick Start
//!
//! ```rust
//! use access_shield::{AccessShield, Identity, QuotaConfig, StaticQuotaSource, Thresholds};
//! use std::sync::Arc;
//!
//! // 1 per minute, 12 per hour, 30 per day for each caller
//! let quota = QuotaConfig::per_identity(
//!     Thresholds::new(1, 12, 30),
//!     Thresholds::new(100, 1_000, 10_000),
//! );
//!
//! let shield = AccessShield::builder()
//!     .with_quota_source(Arc::new(StaticQuotaSource::new(quota)))
//!     .build()
//!     .unwrap();
//!
//! let caller = Identity::from("203.0.113.7");
//! let decision = shield.check(Some(&caller)).unwrap();
//! assert!(decision.is_allowed());
//!
//! // Second request inside the same minute
//! let decision = shield.check(Some(&caller)).unwrap();
//! assert!(!decision.is_allowed());
//! ```
//!
//! ## Windows
//!
//! A window of length `W` evaluated at `now` contains the events with
//! `timestamp > now - W`. An event exactly one minute old has left the minute
//! window. Windows nest: every count in the minute window is also in the hour
//! and day windows.
//!
//! ## Thresholds
//!
//! A request is denied when a count strictly exceeds its threshold. Counts
//! include the request being evaluated, so a minute threshold of 1 admits one
//! request per minute. A threshold of 0 or below denies everything in that
//! scope.
//!
//! Denied requests are still recorded. A caller that keeps retrying while
//! denied keeps its own counts high.
//!
//! ## Configuration
//!
//! Thresholds are read through the [`QuotaSource`] port on every call, so a
//! change takes effect on the next request. A settings store can be adapted
//! with [`SettingsQuotaSource`], which reads these keys:
//!
//! | Key | Type |
//! |-----|------|
//! | `shield.perIdentity.minute` / `.hour` / `.day` | integer |
//! | `shield.aggregate.minute` / `.hour` / `.day` | integer |
//! | `shield.limitAllTraffic` | `true` / `false` |
//!
//! A missing or malformed key is an error. The shield never falls back to a
//! default threshold.
//!
//! ```rust
//! use access_shield::{QuotaSource, SettingsQuotaSource};
//! use std::collections::HashMap;
//!
//! let mut settings = HashMap::new();
//! settings.insert("shield.perIdentity.minute".to_string(), "1".to_string());
//!
//! let source = SettingsQuotaSource::from_map(settings);
//! assert!(source.quota().is_err());
//! ```
//!
//! ## Exempt and Blocked Identities
//!
//! ```rust
//! use access_shield::{AccessShield, Identity, QuotaConfig, StaticQuotaSource, Thresholds, Violation};
//! use std::sync::Arc;
//!
//! let quota = QuotaConfig::per_identity(Thresholds::new(1, 1, 1), Thresholds::new(1, 1, 1));
//! let shield = AccessShield::builder()
//!     .with_quota_source(Arc::new(StaticQuotaSource::new(quota)))
//!     .with_exempt_identities(vec![Identity::from("127.0.0.1")])
//!     .with_blocked_identities(vec![Identity::from("198.51.100.9")])
//!     .build()
//!     .unwrap();
//!
//! let denied = shield.check(Some(&Identity::from("198.51.100.9"))).unwrap();
//! assert_eq!(denied.violation, Some(Violation::Blocked));
//! ```
//!
//! Both kinds are still recorded and show up in telemetry.
//!
//! ## Observability
//!
//! Denials are logged at WARN with the identity, the violated window and the
//! caller's counts. Admissions and prunes are logged at DEBUG. Lifetime
//! counters are available through [`Metrics`]:
//!
//! ```rust,no_run
//! # use access_shield::{AccessShield, QuotaConfig, StaticQuotaSource, Thresholds};
//! # use std::sync::Arc;
//! # let shield = AccessShield::builder()
//! #     .with_quota_source(Arc::new(StaticQuotaSource::new(QuotaConfig::per_identity(
//! #         Thresholds::new(1, 12, 30), Thresholds::new(1, 12, 30)))))
//! #     .build()
//! #     .unwrap();
//! let snapshot = shield.metrics().snapshot();
//! println!("denial rate: {:.1}%", snapshot.denial_rate() * 100.0);
//!
//! let telemetry = shield.telemetry_now();
//! println!("all traffic: {}", telemetry.aggregate);
//! ```
//!
//! ## Memory Management
//!
//! Each call prunes events older than one day from every bucket and drops
//! buckets left empty. With the `async` feature, a [`PruneScheduler`] can run
//! the same prune on an interval so memory is released during quiet periods:
//!
//! ```rust,ignore
//! let handle = PruneScheduler::new(shield.clone(), Duration::from_secs(60))?.start();
//! // ...
//! handle.shutdown().await?;
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    access::{AccessLists, Standing},
    decision::{Decision, Telemetry, Verdict, Violation},
    identity::{AccessEvent, Bucket, Identity},
    quota::{ConfigError, QuotaConfig, Thresholds},
    window::{Window, WindowCounts, DAY_MS, HOUR_MS, MINUTE_MS},
};

pub use application::{
    counter::WindowCounter,
    evaluator::QuotaEvaluator,
    ledger::{AccessLedger, LedgerStorage, PruneReport, Timeline},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, QuotaSource, Storage},
    pruner::{PruneScheduler, DEFAULT_PRUNE_INTERVAL},
    shield::{AccessShield, ShieldBuilder, ShieldError},
};

#[cfg(feature = "async")]
pub use application::pruner::{PrunerHandle, ShutdownError};

pub use infrastructure::{
    clock::SystemClock,
    config::{SettingsLookup, SettingsQuotaSource, SharedQuotaSource, StaticQuotaSource},
    storage::ShardedStorage,
};
