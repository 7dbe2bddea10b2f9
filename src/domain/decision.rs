//! Admission verdicts and the counts reported alongside them.

use crate::domain::window::{Window, WindowCounts};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The shield's binary admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Let the request through to the endpoint
    Allow,
    /// Reject the request
    Deny,
}

impl Verdict {
    /// Check if this verdict is Allow.
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    /// Check if this verdict is Deny.
    pub fn is_deny(&self) -> bool {
        matches!(self, Verdict::Deny)
    }
}

/// The check that produced a `Deny`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "scope", content = "window")]
pub enum Violation {
    /// The caller's own traffic went over a per-identity threshold
    PerIdentity(Window),
    /// All traffic together went over an aggregate threshold
    Aggregate(Window),
    /// The caller is on the blocked list
    Blocked,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::PerIdentity(w) => write!(f, "per-identity {} quota exceeded", w),
            Violation::Aggregate(w) => write!(f, "aggregate {} quota exceeded", w),
            Violation::Blocked => f.write_str("identity blocked"),
        }
    }
}

/// Outcome of one `check_and_record` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Admission verdict
    pub verdict: Verdict,
    /// Why the request was denied; `None` when allowed
    pub violation: Option<Violation>,
    /// The caller's counts, including the request itself
    pub per_identity: WindowCounts,
    /// All-traffic counts; only present when aggregate limits are enforced
    pub aggregate: Option<WindowCounts>,
}

impl Decision {
    /// An allowing decision.
    pub fn allow(per_identity: WindowCounts, aggregate: Option<WindowCounts>) -> Self {
        Self {
            verdict: Verdict::Allow,
            violation: None,
            per_identity,
            aggregate,
        }
    }

    /// A denying decision.
    pub fn deny(
        violation: Violation,
        per_identity: WindowCounts,
        aggregate: Option<WindowCounts>,
    ) -> Self {
        Self {
            verdict: Verdict::Deny,
            violation: Some(violation),
            per_identity,
            aggregate,
        }
    }

    /// Check if the request may proceed.
    pub fn is_allowed(&self) -> bool {
        self.verdict.is_allow()
    }
}

/// Read-only view of all-traffic counts for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    /// All-traffic counts
    pub aggregate: WindowCounts,
}
