//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry / aggregator / orchestrator produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (check latency, failures, hook outcomes)
//!     → tracing.rs (aggregate and per-check spans)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//!     → any tracing layer installed by the host process
//! ```
//!
//! # Design Decisions
//! - Per-check detail lives here, not in probe HTTP responses
//! - Metrics go through the `metrics` facade; recording is a no-op until
//!   an exporter is installed

pub mod logging;
pub mod metrics;
pub mod tracing;
