//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the probe endpoints
//! - Wire up middleware (tracing, panic recovery, request timeout, request ID)
//! - Bind on start, serve in the background, drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::health::HealthAggregator;
use crate::http::handlers::{livez, readyz};
use crate::lifecycle::context::Context;
use crate::lifecycle::orchestrator::{Transport, TransportError};
use crate::lifecycle::shutdown::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub health: HealthAggregator,
    /// List failing check names in 503 responses.
    pub verbose: bool,
    /// Caller-side bound for one probe run.
    pub probe_timeout: Duration,
}

/// Margin kept between the probe deadline and the request timeout so a
/// slow probe is answered by its handler rather than by the timeout layer.
const PROBE_HEADROOM: Duration = Duration::from_millis(100);

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .route("/healthz", get(readyz))
        .route("/healthz/liveness", get(livez))
        .route("/healthz/readiness", get(readyz))
        .with_state(state);
    with_middleware(routes, request_timeout)
}

/// Wrap `router` in the server's middleware stack.
///
/// Requests that outlive `request_timeout` get 503, and a panicking handler
/// becomes a 500 instead of tearing down the connection.
pub fn with_middleware(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Probe deadline for a server whose requests time out after `request_timeout`.
pub fn probe_timeout_for(request_timeout: Duration) -> Duration {
    if request_timeout > PROBE_HEADROOM * 2 {
        request_timeout - PROBE_HEADROOM
    } else {
        request_timeout / 2
    }
}

struct Running {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<std::io::Result<()>>,
}

/// HTTP transport driven by the orchestrator.
pub struct HttpServer {
    bind_address: String,
    router: Router,
    running: Mutex<Option<Running>>,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, state: AppState) -> Self {
        Self {
            bind_address: config.bind_address.clone(),
            router: build_router(state, config.request_timeout()),
            running: Mutex::new(None),
        }
    }

    /// Convenience for the common case: probe endpoints over `health`.
    pub fn with_health(config: &ServerConfig, health: HealthAggregator, verbose: bool) -> Arc<Self> {
        let state = AppState {
            health,
            verbose,
            probe_timeout: probe_timeout_for(config.request_timeout()),
        };
        Arc::new(Self::new(config, state))
    }

    /// Address actually bound, once started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }
}

#[async_trait]
impl Transport for HttpServer {
    async fn start(&self) -> Result<(), TransportError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(TransportError::AlreadyStarted);
        }

        let bind_error = |source| TransportError::Bind {
            address: self.bind_address.clone(),
            source,
        };
        let listener = TcpListener::bind(&self.bind_address)
            .await
            .map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let shutdown = Shutdown::new();
        let signal = shutdown.wait();
        let app = self.router.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
        });

        tracing::info!(address = %local_addr, "HTTP server listening");
        *running = Some(Running {
            local_addr,
            shutdown,
            task,
        });
        Ok(())
    }

    async fn shutdown(&self, ctx: &Context) -> Result<(), TransportError> {
        let Some(running) = self.running.lock().await.take() else {
            return Err(TransportError::NotStarted);
        };

        tracing::info!(address = %running.local_addr, "HTTP server draining");
        running.shutdown.trigger();

        let mut task = running.task;
        match ctx.run(&mut task).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!("HTTP server stopped");
                Ok(())
            }
            Ok(Ok(Err(err))) => Err(TransportError::Server(err)),
            Ok(Err(join)) => Err(TransportError::Server(std::io::Error::other(join))),
            Err(done) => {
                task.abort();
                Err(TransportError::Interrupted(done))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_deadline_stays_below_request_timeout() {
        assert_eq!(
            probe_timeout_for(Duration::from_secs(1)),
            Duration::from_millis(900)
        );
        assert_eq!(
            probe_timeout_for(Duration::from_millis(150)),
            Duration::from_millis(75)
        );
        assert!(probe_timeout_for(Duration::from_secs(30)) < Duration::from_secs(30));
    }
}
