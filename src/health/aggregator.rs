//! Concurrent liveness/readiness aggregation.
//!
//! Every run fans out one task per registered check, waits for all of
//! them, and folds the failures into a single [`HealthError`]. A slow
//! check only delays the run up to its own timeout; a panicking check is
//! reported under its name instead of taking the process down.

use std::any::Any;

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::Instrument;

use crate::health::error::{CheckFailure, HealthError, ProbeError};
use crate::health::probe::{Check, ProbeKind};
use crate::lifecycle::context::Context;
use crate::lifecycle::hook::NamedHook;
use crate::lifecycle::registry::Registry;
use crate::observability::{metrics, tracing as spans};

/// Answers liveness and readiness from the registry's check sets.
#[derive(Debug, Clone)]
pub struct HealthAggregator {
    registry: Registry,
}

impl HealthAggregator {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub async fn readiness(&self, ctx: &Context) -> Result<(), HealthError> {
        self.check(ProbeKind::Readiness, ctx).await
    }

    pub async fn liveness(&self, ctx: &Context) -> Result<(), HealthError> {
        self.check(ProbeKind::Liveness, ctx).await
    }

    /// Run every check registered for `probe` concurrently.
    ///
    /// The set is read once at the start of the run; checks registered
    /// while it is in flight are picked up by the next run.
    pub async fn check(&self, probe: ProbeKind, ctx: &Context) -> Result<(), HealthError> {
        let checks = self.registry.checks(probe).snapshot();
        if checks.is_empty() {
            return Ok(());
        }

        let span = spans::aggregate_span(probe, checks.len());
        let result = fan_out(probe, checks, ctx)
            .instrument(span.clone())
            .await;

        metrics::record_probe(probe, result.is_ok());
        if let Err(err) = &result {
            spans::record_health_error(&span, err);
        }
        result
    }
}

async fn fan_out(
    probe: ProbeKind,
    checks: Vec<NamedHook<Check>>,
    ctx: &Context,
) -> Result<(), HealthError> {
    // Sized so no task ever waits on capacity.
    let (tx, mut rx) = mpsc::channel(checks.len());

    let mut names = Vec::with_capacity(checks.len());
    let mut tasks = Vec::with_capacity(checks.len());
    for NamedHook { name, hook } in checks {
        let span = spans::check_span(probe, &name);
        let task = run_check(probe, name.clone(), hook, ctx.clone(), tx.clone());
        names.push(name);
        tasks.push(tokio::spawn(task.instrument(span)));
    }
    drop(tx);

    let joined = join_all(tasks).await;

    let mut failures = Vec::new();
    for (name, outcome) in names.into_iter().zip(joined) {
        if let Err(err) = outcome {
            tracing::error!(check = %name, error = %err, "Health check task did not complete");
            failures.push(CheckFailure::new(name, join_error(err)));
        }
    }
    while let Some(failure) = rx.recv().await {
        failures.push(failure);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(HealthError::new(probe, failures))
    }
}

async fn run_check(
    probe: ProbeKind,
    name: String,
    check: Check,
    ctx: Context,
    results: mpsc::Sender<CheckFailure>,
) {
    let started = Instant::now();
    let outcome = check.call(ctx).await;
    let elapsed = started.elapsed();
    metrics::record_check(&name, probe, elapsed, outcome.is_ok());

    match outcome {
        Ok(()) => {
            tracing::debug!(elapsed = ?elapsed, "Health check passed");
        }
        Err(err) => {
            tracing::Span::current().record("otel.status_code", "ERROR");
            tracing::warn!(elapsed = ?elapsed, error = %err, "Health check failed");
            // Capacity equals the number of checks and each sends at most once.
            let _ = results.send(CheckFailure::new(name, err)).await;
        }
    }
}

fn join_error(err: JoinError) -> ProbeError {
    if err.is_panic() {
        ProbeError::Panicked(panic_message(err.into_panic()))
    } else {
        ProbeError::Aborted
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::{HealthzOptions, Probes};

    #[tokio::test]
    async fn empty_registry_is_healthy() {
        let aggregator = HealthAggregator::new(Registry::new());
        assert!(aggregator.readiness(&Context::background()).await.is_ok());
        assert!(aggregator.liveness(&Context::background()).await.is_ok());
    }

    #[tokio::test]
    async fn liveness_ignores_readiness_only_checks() {
        let registry = Registry::new();
        registry.register_healthz_with(
            "upstream",
            |_ctx| async { Err("unreachable".into()) },
            HealthzOptions::default().probes(Probes::Readiness),
        );
        let aggregator = HealthAggregator::new(registry);

        assert!(aggregator.liveness(&Context::background()).await.is_ok());
        let err = aggregator.readiness(&Context::background()).await.unwrap_err();
        assert_eq!(err.failed_names(), vec!["upstream"]);
        assert_eq!(err.probe(), ProbeKind::Readiness);
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42_u8)), "non-string panic payload");
    }
}
