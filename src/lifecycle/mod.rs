//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap:
//!     Subsystems constructed → register_startup / register_shutdown /
//!     register_healthz on the shared Registry (registry.rs)
//!
//! Start (orchestrator.rs):
//!     Transport start → startup hooks in order → first error aborts
//!
//! Stop (orchestrator.rs):
//!     Signal (signals.rs) → transport drain (shutdown.rs)
//!     → every shutdown hook, failures collected
//! ```
//!
//! # Design Decisions
//! - The registry is passed explicitly, never global
//! - Hooks take a Context (context.rs) carrying cancellation and deadline
//! - Start is fail-fast, stop is best-effort

pub mod context;
pub mod hook;
pub mod orchestrator;
pub mod registry;
pub mod shutdown;
pub mod signals;

pub use context::{Context, Done};
pub use hook::{Hook, HookError, HookResult, HookSet, NamedHook};
pub use orchestrator::{
    LifecycleError, Orchestrator, ShutdownError, ShutdownFailure, Transport, TransportError,
};
pub use registry::Registry;
pub use shutdown::Shutdown;
