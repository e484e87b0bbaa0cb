//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (probe.rs):
//!     check fn + HealthzOptions
//!     → Check (bound to its timeout)
//!     → liveness and/or readiness set in the registry
//!
//! Aggregation (aggregator.rs):
//!     liveness()/readiness()
//!     → one task per check, each under its own timeout
//!     → barrier
//!     → Ok or HealthError (error.rs) naming every failed check
//! ```
//!
//! # Design Decisions
//! - Checks run concurrently; total latency tracks the slowest check
//! - No aggregate deadline beyond per-check timeouts and the caller's context
//! - Failures are attributed by registration name
//! - Panics are contained per check

pub mod aggregator;
pub mod error;
pub mod probe;

pub use aggregator::HealthAggregator;
pub use error::{CheckFailure, HealthError, ProbeError};
pub use probe::{HealthzOptions, ProbeKind, Probes, DEFAULT_CHECK_TIMEOUT};
