//! Process lifecycle controller with concurrent health-check aggregation.
//!
//! Subsystems register startup hooks, shutdown hooks and health checks on
//! a shared [`Registry`]; the [`HealthAggregator`] answers liveness and
//! readiness by running the checks concurrently; the [`Orchestrator`]
//! sequences process start and stop.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use health::{HealthAggregator, HealthError, HealthzOptions, ProbeKind, Probes};
pub use http::HttpServer;
pub use lifecycle::{Context, Orchestrator, Registry};
