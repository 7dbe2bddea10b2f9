//! Domain layer - pure types with no concurrency or I/O.
//!
//! This layer contains the core concepts of the shield:
//! - Caller identities and ledger buckets
//! - Exempt and blocked identity lists
//! - Lookback windows and counts
//! - Quota thresholds and configuration errors
//! - Verdicts, violations and telemetry
//!
//! All types in this layer are plain values and easily testable.

pub mod access;
pub mod decision;
pub mod identity;
pub mod quota;
pub mod window;
