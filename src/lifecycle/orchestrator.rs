//! Process start/stop sequencing.
//!
//! # Design Decisions
//! - Fail fast on start: a half-started process must not serve traffic
//! - Best effort on stop: every hook runs even after earlier failures
//! - Hooks run one at a time, in registration order

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

use crate::lifecycle::context::Context;
use crate::lifecycle::hook::{HookError, NamedHook};
use crate::lifecycle::registry::Registry;
use crate::observability::metrics;

/// Inbound transport started before and stopped before the hooks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bind and begin serving in the background. Must not block on serving.
    async fn start(&self) -> Result<(), TransportError>;

    /// Stop accepting and drain, bounded by `ctx`.
    async fn shutdown(&self, ctx: &Context) -> Result<(), TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport already started")]
    AlreadyStarted,

    #[error("transport not started")]
    NotStarted,

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),

    #[error("shutdown did not finish: {0}")]
    Interrupted(#[from] crate::lifecycle::context::Done),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("transport failed to start: {0}")]
    Transport(#[from] TransportError),

    #[error("startup hook {name} failed: {source}")]
    Startup {
        name: String,
        #[source]
        source: HookError,
    },
}

/// One failed step of a shutdown.
#[derive(Debug)]
pub struct ShutdownFailure {
    pub name: String,
    pub error: HookError,
}

/// Every failure collected during one shutdown.
#[derive(Debug)]
pub struct ShutdownError {
    failures: Vec<ShutdownFailure>,
}

impl ShutdownError {
    pub fn failures(&self) -> &[ShutdownFailure] {
        &self.failures
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.name.as_str()).collect()
    }
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("shutdown incomplete: ")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} failed: {}", failure.name, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ShutdownError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|f| f.error.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Name the transport's shutdown failure is reported under.
pub const TRANSPORT_HOOK: &str = "transport";

/// Drives process start and stop from the registry.
pub struct Orchestrator {
    registry: Registry,
    transport: Arc<dyn Transport>,
}

impl Orchestrator {
    pub fn new(registry: Registry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start the transport, then every startup hook in order.
    ///
    /// The first failure stops the sequence and is returned.
    pub async fn start(&self, ctx: &Context) -> Result<(), LifecycleError> {
        self.transport.start().await?;

        let starters = self.registry.starters().snapshot();
        tracing::info!(hooks = starters.len(), "Running startup hooks");

        for NamedHook { name, hook } in starters {
            let started = Instant::now();
            match hook.call(ctx.clone()).await {
                Ok(()) => {
                    metrics::record_hook("startup", &name, true);
                    tracing::info!(hook = %name, elapsed = ?started.elapsed(), "Startup hook completed");
                }
                Err(source) => {
                    metrics::record_hook("startup", &name, false);
                    tracing::error!(hook = %name, error = %source, "Startup hook failed, aborting start");
                    return Err(LifecycleError::Startup { name, source });
                }
            }
        }

        tracing::info!("Startup complete");
        Ok(())
    }

    /// Stop the transport, then run every shutdown hook in order.
    ///
    /// Failures are logged and collected; later hooks still run.
    pub async fn shutdown(&self, ctx: &Context) -> Result<(), ShutdownError> {
        let mut failures = Vec::new();

        if let Err(err) = self.transport.shutdown(ctx).await {
            tracing::error!(error = %err, "Transport shutdown failed");
            failures.push(ShutdownFailure {
                name: TRANSPORT_HOOK.to_string(),
                error: Box::new(err),
            });
        }

        let shutdowners = self.registry.shutdowners().snapshot();
        tracing::info!(hooks = shutdowners.len(), "Running shutdown hooks");

        for NamedHook { name, hook } in shutdowners {
            let started = Instant::now();
            match hook.call(ctx.clone()).await {
                Ok(()) => {
                    metrics::record_hook("shutdown", &name, true);
                    tracing::info!(hook = %name, elapsed = ?started.elapsed(), "Shutdown hook completed");
                }
                Err(error) => {
                    metrics::record_hook("shutdown", &name, false);
                    tracing::error!(hook = %name, error = %error, "Shutdown hook failed, continuing");
                    failures.push(ShutdownFailure { name, error });
                }
            }
        }

        if failures.is_empty() {
            tracing::info!("Shutdown complete");
            Ok(())
        } else {
            tracing::warn!(failed = failures.len(), "Shutdown finished with failures");
            Err(ShutdownError { failures })
        }
    }
}
