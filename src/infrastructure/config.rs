//! Quota source adapters.
//!
//! The configuration store is external; these adapters turn what it holds
//! into a validated `QuotaConfig` on every read.

use crate::application::ports::QuotaSource;
use crate::domain::quota::{ConfigError, QuotaConfig, Thresholds};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// A fixed configuration, mainly for tests and embedded use.
#[derive(Debug, Clone, Copy)]
pub struct StaticQuotaSource {
    config: QuotaConfig,
}

impl StaticQuotaSource {
    /// Create a source that always returns `config`.
    pub fn new(config: QuotaConfig) -> Self {
        Self { config }
    }
}

impl QuotaSource for StaticQuotaSource {
    fn quota(&self) -> Result<QuotaConfig, ConfigError> {
        Ok(self.config)
    }
}

/// A configuration the admin layer can replace at runtime.
///
/// Clones share the same value; an update through one clone is seen by the
/// shield on its next evaluation.
#[derive(Debug, Clone)]
pub struct SharedQuotaSource {
    config: Arc<RwLock<QuotaConfig>>,
}

impl SharedQuotaSource {
    /// Create a shared source holding `config`.
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Replace the configuration.
    pub fn update(&self, config: QuotaConfig) {
        // A writer cannot leave a Copy value half-written, so a poisoned lock
        // still holds a consistent config.
        let mut guard = self.config.write().unwrap_or_else(|e| e.into_inner());
        *guard = config;
    }
}

impl QuotaSource for SharedQuotaSource {
    fn quota(&self) -> Result<QuotaConfig, ConfigError> {
        let guard = self.config.read().unwrap_or_else(|e| e.into_inner());
        Ok(*guard)
    }
}

/// Function that looks up a raw setting by key.
pub type SettingsLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync + 'static>;

/// Reads thresholds from a flat key/value settings store.
///
/// With the default prefix the keys are:
///
/// ```text
/// shield.perIdentity.minute   shield.aggregate.minute
/// shield.perIdentity.hour     shield.aggregate.hour
/// shield.perIdentity.day      shield.aggregate.day
/// shield.limitAllTraffic
/// ```
///
/// Every key is required. A missing key or a value that does not parse is a
/// `ConfigError`; no value is ever defaulted.
///
/// # Example
/// ```
/// use access_shield::{QuotaSource, SettingsQuotaSource};
/// use std::collections::HashMap;
///
/// let settings = HashMap::from([
///     ("shield.perIdentity.minute".to_string(), "1".to_string()),
///     ("shield.perIdentity.hour".to_string(), "12".to_string()),
///     ("shield.perIdentity.day".to_string(), "30".to_string()),
///     ("shield.aggregate.minute".to_string(), "100".to_string()),
///     ("shield.aggregate.hour".to_string(), "1000".to_string()),
///     ("shield.aggregate.day".to_string(), "10000".to_string()),
///     ("shield.limitAllTraffic".to_string(), "false".to_string()),
/// ]);
///
/// let source = SettingsQuotaSource::from_map(settings);
/// let config = source.quota().unwrap();
/// assert_eq!(config.per_identity.minute, 1);
/// ```
#[derive(Clone)]
pub struct SettingsQuotaSource {
    lookup: SettingsLookup,
    prefix: String,
}

impl SettingsQuotaSource {
    /// Default key prefix.
    pub const DEFAULT_PREFIX: &'static str = "shield";

    /// Create a source reading through `lookup`.
    pub fn new(lookup: SettingsLookup) -> Self {
        Self {
            lookup,
            prefix: Self::DEFAULT_PREFIX.to_string(),
        }
    }

    /// Create a source over a fixed map of settings.
    pub fn from_map(settings: HashMap<String, String>) -> Self {
        Self::new(Arc::new(move |key: &str| settings.get(key).cloned()))
    }

    /// Use a different key prefix, e.g. one per guarded endpoint.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn raw(&self, suffix: &str) -> Result<(String, String), ConfigError> {
        let key = format!("{}.{}", self.prefix, suffix);
        match (self.lookup)(&key) {
            Some(value) => Ok((key, value)),
            None => Err(ConfigError::MissingKey(key)),
        }
    }

    fn threshold(&self, suffix: &str) -> Result<i64, ConfigError> {
        let (key, value) = self.raw(suffix)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidValue { key, value })
    }

    fn flag(&self, suffix: &str) -> Result<bool, ConfigError> {
        let (key, value) = self.raw(suffix)?;
        match value.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value }),
        }
    }

    fn thresholds(&self, scope: &str) -> Result<Thresholds, ConfigError> {
        Ok(Thresholds {
            minute: self.threshold(&format!("{}.minute", scope))?,
            hour: self.threshold(&format!("{}.hour", scope))?,
            day: self.threshold(&format!("{}.day", scope))?,
        })
    }
}

impl QuotaSource for SettingsQuotaSource {
    fn quota(&self) -> Result<QuotaConfig, ConfigError> {
        Ok(QuotaConfig {
            per_identity: self.thresholds("perIdentity")?,
            aggregate: self.thresholds("aggregate")?,
            limit_all_traffic: self.flag("limitAllTraffic")?,
        })
    }
}

impl fmt::Debug for SettingsQuotaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsQuotaSource")
            .field("lookup", &"<fn>")
            .field("prefix", &self.prefix)
            .finish()
    }
}
