//! Caller identities and the ledger buckets they map to.
//!
//! An identity is whatever the front end uses to tell callers apart, usually a
//! normalized source address. Every identity owns one bucket in the ledger, and
//! one reserved bucket holds all traffic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Key used to bucket a caller's requests.
///
/// Cloning is cheap: the key is reference counted so the ledger, the decision
/// and any log record can share it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Arc<str>);

impl Identity {
    /// Create an identity from an arbitrary key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::from(key.into()))
    }

    /// Create an identity from a source address.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) collapse to their IPv4
    /// form so a client gets the same bucket regardless of socket family.
    ///
    /// # Example
    /// ```
    /// use access_shield::Identity;
    /// use std::net::IpAddr;
    ///
    /// let v4: IpAddr = "10.0.0.7".parse().unwrap();
    /// let mapped: IpAddr = "::ffff:10.0.0.7".parse().unwrap();
    /// assert_eq!(Identity::from_ip(v4), Identity::from_ip(mapped));
    /// ```
    pub fn from_ip(addr: IpAddr) -> Self {
        let addr = match addr {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => IpAddr::V6(v6),
            },
            v4 => v4,
        };
        Self::new(addr.to_string())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Identity {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<IpAddr> for Identity {
    fn from(addr: IpAddr) -> Self {
        Self::from_ip(addr)
    }
}

/// A ledger bucket.
///
/// `Global` is reserved for aggregate counting and can never collide with a
/// caller identity, whatever string that identity carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// All traffic
    Global,
    /// One caller
    Identity(Identity),
}

impl Bucket {
    /// Bucket for an optional identity; `None` selects the global bucket.
    pub fn of(identity: Option<&Identity>) -> Self {
        match identity {
            Some(id) => Bucket::Identity(id.clone()),
            None => Bucket::Global,
        }
    }

    /// Check if this is the reserved global bucket.
    pub fn is_global(&self) -> bool {
        matches!(self, Bucket::Global)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Global => f.write_str("<global>"),
            Bucket::Identity(id) => write!(f, "{}", id),
        }
    }
}

/// An access to the guarded endpoint.
///
/// Created once, when the shield records a request, and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    /// Caller identity; `None` for a globally-scoped event
    pub identity: Option<Identity>,
    /// Epoch milliseconds
    pub timestamp: u64,
}

impl AccessEvent {
    /// Create a new access event.
    pub fn new(identity: Option<Identity>, timestamp: u64) -> Self {
        Self {
            identity,
            timestamp,
        }
    }
}
