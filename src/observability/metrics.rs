//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_health_check_duration_seconds` (histogram): per-check latency by check, probe
//! - `lifecycle_health_check_failures_total` (counter): failed checks by check, probe
//! - `lifecycle_probe_runs_total` (counter): aggregate runs by probe, outcome
//! - `lifecycle_hook_runs_total` (counter): startup/shutdown hook runs by phase, hook, outcome

use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::health::probe::ProbeKind;

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to build Prometheus exporter: {0}")]
    Build(#[from] BuildError),

    #[error("metrics exporter already running")]
    AlreadyRunning,

    #[error("a global metrics recorder is already installed")]
    RecorderInstalled,
}

/// Prometheus recorder plus its scrape listener, stoppable from a shutdown hook.
#[derive(Debug)]
pub struct MetricsExporter {
    address: SocketAddr,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MetricsExporter {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            task: Mutex::new(None),
        }
    }

    /// Install the global recorder and start serving scrapes.
    ///
    /// Must run inside a Tokio runtime.
    pub fn start(&self) -> Result<(), MetricsError> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return Err(MetricsError::AlreadyRunning);
        }

        let (recorder, mut exporter) = PrometheusBuilder::new()
            .with_http_listener(self.address)
            .build()?;
        let handle = recorder.handle();
        ::metrics::set_global_recorder(recorder).map_err(|_| MetricsError::RecorderInstalled)?;

        *task = Some(tokio::spawn(async move {
            let mut upkeep = tokio::time::interval(UPKEEP_INTERVAL);
            loop {
                tokio::select! {
                    result = &mut exporter => {
                        if let Err(e) = result {
                            tracing::error!(error = ?e, "Metrics exporter failed");
                        }
                        return;
                    }
                    _ = upkeep.tick() => handle.run_upkeep(),
                }
            }
        }));
        tracing::info!(address = %self.address, "Metrics exporter listening");
        Ok(())
    }

    /// Stop the scrape listener. Returns `false` when it was not running.
    pub fn stop(&self) -> bool {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        match task {
            Some(task) => {
                task.abort();
                tracing::info!(address = %self.address, "Metrics exporter stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

pub fn record_check(check: &str, probe: ProbeKind, elapsed: Duration, healthy: bool) {
    histogram!(
        "lifecycle_health_check_duration_seconds",
        "check" => check.to_string(),
        "probe" => probe.as_str()
    )
    .record(elapsed.as_secs_f64());

    if !healthy {
        counter!(
            "lifecycle_health_check_failures_total",
            "check" => check.to_string(),
            "probe" => probe.as_str()
        )
        .increment(1);
    }
}

pub fn record_probe(probe: ProbeKind, healthy: bool) {
    counter!(
        "lifecycle_probe_runs_total",
        "probe" => probe.as_str(),
        "outcome" => outcome(healthy)
    )
    .increment(1);
}

pub fn record_hook(phase: &'static str, hook: &str, ok: bool) {
    counter!(
        "lifecycle_hook_runs_total",
        "phase" => phase,
        "hook" => hook.to_string(),
        "outcome" => outcome(ok)
    )
    .increment(1);
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}
