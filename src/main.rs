//! Service lifecycle host.
//!
//! # Architecture Overview
//!
//! ```text
//!   bootstrap                         ┌──────────────────────────────┐
//!   ─────────▶ subsystems register ──▶│           Registry           │
//!                                     │ starters │ shutdowners │ checks
//!                                     └────┬──────────┬──────────┬──┘
//!                                          │          │          │
//!                      ┌───────────────────▼──────────▼──┐   ┌───▼──────────────┐
//!   SIGINT/SIGTERM ───▶│          Orchestrator           │   │ HealthAggregator │
//!                      │ start: transport, hooks (fail-  │   │ one task/check,  │
//!                      │ fast)  stop: transport, hooks   │   │ per-check timeout│
//!                      │ (best-effort)                   │   └───▲──────────────┘
//!                      └───────────────┬─────────────────┘       │
//!                                      │                         │
//!                              ┌───────▼────────┐   /livez /readyz
//!                              │  HTTP server   │───────────────┘
//!                              └────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use service_lifecycle::config::{load_config, AppConfig};
use service_lifecycle::health::{HealthAggregator, Probes};
use service_lifecycle::lifecycle::{signals, Context, HookError, Orchestrator, Registry};
use service_lifecycle::observability::logging;
use service_lifecycle::observability::metrics::MetricsExporter;
use service_lifecycle::HttpServer;

#[derive(Parser)]
#[command(name = "service-lifecycle")]
#[command(about = "Runs the lifecycle controller and serves health probes", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-lifecycle starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        default_check_timeout_ms = config.health.default_timeout_ms,
        shutdown_timeout_secs = config.shutdown.timeout_secs,
        "Configuration loaded"
    );

    let registry = Registry::with_healthz_defaults(config.health.healthz_defaults());
    if let Err(e) = register_builtin(&registry, &config) {
        tracing::error!(error = %e, "Failed to register built-in components");
        return ExitCode::FAILURE;
    }

    let health = HealthAggregator::new(registry.clone());
    let server = HttpServer::with_health(&config.server, health, config.health.verbose);
    let orchestrator = Orchestrator::new(registry, server);

    let root = Context::background();
    if let Err(e) = orchestrator.start(&root).await {
        tracing::error!(error = %e, "Startup failed");
        let stop = root.with_timeout(config.shutdown.timeout());
        if let Err(e) = orchestrator.shutdown(&stop).await {
            tracing::error!(error = %e, "Cleanup after failed startup incomplete");
        }
        return ExitCode::FAILURE;
    }

    if let Err(e) = signals::wait_for_signal().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signals");
    }

    let stop = root.with_timeout(config.shutdown.timeout());
    let code = match orchestrator.shutdown(&stop).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Shutdown incomplete");
            ExitCode::FAILURE
        }
    };
    root.cancel();
    code
}

/// Collaborators owned by the host process itself.
fn register_builtin(registry: &Registry, config: &AppConfig) -> Result<(), HookError> {
    if config.observability.metrics_enabled {
        let exporter = Arc::new(MetricsExporter::new(
            config.observability.metrics_address.parse()?,
        ));

        let starting = Arc::clone(&exporter);
        registry.register_startup("metrics", move |_ctx| {
            let result = starting.start().map_err(HookError::from);
            async move { result }
        });
        registry.register_shutdown("metrics", move |_ctx| {
            exporter.stop();
            async { Ok(()) }
        });
    }

    // The runtime answering this probe is the liveness signal.
    registry.register_healthz_with(
        "runtime",
        |_ctx| async {
            tokio::task::yield_now().await;
            Ok(())
        },
        registry.healthz_defaults().probes(Probes::Liveness),
    );
    Ok(())
}
