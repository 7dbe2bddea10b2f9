//! Quota thresholds.
//!
//! Thresholds come from an external configuration store and are read fresh
//! for every evaluation. A threshold `N` admits at most `N` events in its
//! window, counting the request being evaluated; any `N <= 0` admits nothing.
//! There is no "unlimited" sentinel: use a very large threshold instead.

use crate::domain::window::Window;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when quota configuration cannot be turned into a `QuotaConfig`.
///
/// The shield never substitutes defaults for bad configuration; every one of
/// these rejects the operation that needed the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("missing quota setting `{0}`")]
    MissingKey(String),
    /// A setting is present but not a valid value for its type
    #[error("invalid value `{value}` for quota setting `{key}`")]
    InvalidValue {
        /// Setting name
        key: String,
        /// Raw value as found in the store
        value: String,
    },
    /// Background prune interval must be greater than zero
    #[error("prune interval must be greater than 0")]
    ZeroPruneInterval,
    /// The configuration store could not be read
    #[error("quota configuration unavailable: {0}")]
    Unavailable(String),
}

/// One threshold per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Maximum events per minute
    pub minute: i64,
    /// Maximum events per hour
    pub hour: i64,
    /// Maximum events per day
    pub day: i64,
}

impl Thresholds {
    /// Create thresholds from explicit values.
    pub const fn new(minute: i64, hour: i64, day: i64) -> Self {
        Self { minute, hour, day }
    }

    /// Threshold for one window.
    pub fn get(&self, window: Window) -> i64 {
        match window {
            Window::Minute => self.minute,
            Window::Hour => self.hour,
            Window::Day => self.day,
        }
    }

    /// Check if `count` events in `window` go over the threshold.
    pub fn exceeded_by(&self, window: Window, count: u64) -> bool {
        let limit = self.get(window);
        // Negative limits admit nothing; any recorded event exceeds them.
        limit < 0 || count > limit as u64
    }
}

/// Complete quota configuration for one shield.
///
/// # Example
/// ```
/// use access_shield::{QuotaConfig, Thresholds};
///
/// let config: QuotaConfig = serde_json::from_str(r#"{
///     "perIdentity": { "minute": 1, "hour": 12, "day": 30 },
///     "aggregate": { "minute": 100, "hour": 1000, "day": 10000 },
///     "limitAllTraffic": false
/// }"#).unwrap();
///
/// assert_eq!(config.per_identity, Thresholds::new(1, 12, 30));
/// assert!(!config.limit_all_traffic);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaConfig {
    /// Limits applied to each identity's own traffic
    pub per_identity: Thresholds,
    /// Limits applied to all traffic together
    pub aggregate: Thresholds,
    /// Whether the aggregate limits are enforced
    pub limit_all_traffic: bool,
}

impl QuotaConfig {
    /// Create a configuration that only enforces per-identity limits.
    pub fn per_identity(per_identity: Thresholds, aggregate: Thresholds) -> Self {
        Self {
            per_identity,
            aggregate,
            limit_all_traffic: false,
        }
    }

    /// Create a configuration that enforces both per-identity and aggregate limits.
    pub fn with_aggregate(per_identity: Thresholds, aggregate: Thresholds) -> Self {
        Self {
            per_identity,
            aggregate,
            limit_all_traffic: true,
        }
    }
}
