//! Health check registration options and the timeout-bound check wrapper.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use tokio::time::Instant;

use crate::health::error::ProbeError;
use crate::lifecycle::context::{Context, Done};
use crate::lifecycle::hook::HookResult;

/// Per-check timeout used when none is given.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// The two questions a process answers about its health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// Is the process itself still running correctly.
    Liveness,
    /// Can the process take traffic (dependencies reachable).
    Readiness,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Liveness => "liveness",
            ProbeKind::Readiness => "readiness",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which probe sets a check is registered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Probes {
    Liveness,
    Readiness,
    #[default]
    Both,
}

impl Probes {
    pub fn includes(self, kind: ProbeKind) -> bool {
        matches!(
            (self, kind),
            (Probes::Both, _)
                | (Probes::Liveness, ProbeKind::Liveness)
                | (Probes::Readiness, ProbeKind::Readiness)
        )
    }
}

/// Options fixed at health check registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthzOptions {
    timeout: Duration,
    probes: Probes,
}

impl Default for HealthzOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CHECK_TIMEOUT,
            probes: Probes::default(),
        }
    }
}

impl HealthzOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn probes(mut self, probes: Probes) -> Self {
        self.probes = probes;
        self
    }

    pub fn timeout_value(&self) -> Duration {
        self.timeout
    }

    pub fn probes_value(&self) -> Probes {
        self.probes
    }
}

type CheckFn = dyn Fn(Context) -> BoxFuture<'static, Result<(), ProbeError>> + Send + Sync;

/// A registered health check, already bound to its timeout.
#[derive(Clone)]
pub struct Check {
    timeout: Duration,
    inner: Arc<CheckFn>,
}

impl Check {
    /// Wrap `check` so every invocation runs under a child context that
    /// expires after `timeout`. The child context is released when the
    /// invocation returns, whatever the outcome.
    pub fn wrap<F, Fut>(check: F, timeout: Duration) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let check = Arc::new(check);
        let inner = move |ctx: Context| {
            let check = Arc::clone(&check);
            async move {
                let started = Instant::now();
                let scoped = ctx.with_timeout(timeout);
                let _release = scoped.cancel_on_drop();
                match scoped.run((*check)(scoped.clone())).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(ProbeError::Failed(err)),
                    // The caller's deadline may fire before the check's own timeout.
                    Err(Done::DeadlineExceeded) => {
                        Err(ProbeError::DeadlineExceeded(started.elapsed()))
                    }
                    Err(Done::Cancelled) => Err(ProbeError::Cancelled),
                }
            }
            .boxed()
        };

        Self {
            timeout,
            inner: Arc::new(inner),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn call(&self, ctx: Context) -> BoxFuture<'static, Result<(), ProbeError>> {
        (self.inner)(ctx)
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
