//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Access ledger (storage of timestamped events per bucket)
//! - Window counter and quota evaluator (decision making)
//! - Shield facade (the entry point per request)
//! - Prune scheduler (periodic expiry)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod counter;
pub mod evaluator;
pub mod ledger;
pub mod metrics;
pub mod ports;
pub mod pruner;
pub mod shield;
