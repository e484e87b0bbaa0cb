//! HTTP probe surface.
//!
//! # Data Flow
//! ```text
//! GET /livez   → handlers.rs → HealthAggregator::liveness
//! GET /readyz  → handlers.rs → HealthAggregator::readiness
//! GET /healthz → same as /readyz
//! GET /healthz/liveness  → same as /livez
//! GET /healthz/readiness → same as /readyz
//!     → 200 {"status":"ok"} | 503 {"status":"unavailable"}
//! ```

pub mod handlers;
pub mod server;

pub use server::{build_router, probe_timeout_for, with_middleware, AppState, HttpServer};
