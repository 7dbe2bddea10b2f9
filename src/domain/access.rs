//! Standing lists that override quota evaluation for specific identities.

use crate::domain::identity::Identity;
use std::collections::BTreeSet;

/// How the shield treats an identity before looking at its counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    /// Subject to quotas
    Regular,
    /// Recorded but never denied
    Exempt,
    /// Recorded and always denied
    Blocked,
}

/// Exempt and blocked identities.
///
/// An identity on both lists is blocked. Anonymous callers are always regular.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessLists {
    exempt: BTreeSet<Identity>,
    blocked: BTreeSet<Identity>,
}

impl AccessLists {
    /// Create empty lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the exempt list.
    pub fn with_exempt(mut self, identities: impl IntoIterator<Item = Identity>) -> Self {
        self.exempt = identities.into_iter().collect();
        self
    }

    /// Replace the blocked list.
    pub fn with_blocked(mut self, identities: impl IntoIterator<Item = Identity>) -> Self {
        self.blocked = identities.into_iter().collect();
        self
    }

    /// Standing of an identity.
    pub fn standing(&self, identity: Option<&Identity>) -> Standing {
        match identity {
            Some(id) if self.blocked.contains(id) => Standing::Blocked,
            Some(id) if self.exempt.contains(id) => Standing::Exempt,
            _ => Standing::Regular,
        }
    }

    /// Check if both lists are empty.
    pub fn is_empty(&self) -> bool {
        self.exempt.is_empty() && self.blocked.is_empty()
    }
}
