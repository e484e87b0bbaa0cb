//! Start/stop sequencing.

use std::net::TcpListener;
use std::sync::Arc;

use service_lifecycle::config::ServerConfig;
use service_lifecycle::health::HealthAggregator;
use service_lifecycle::lifecycle::{
    Context, LifecycleError, Orchestrator, Registry, Transport, TransportError,
};
use service_lifecycle::HttpServer;

mod common;

use common::{CallLog, StubTransport};

fn orchestrator(registry: Registry, transport: StubTransport) -> (Orchestrator, CallLog) {
    let log = transport.log.clone();
    (Orchestrator::new(registry, Arc::new(transport)), log)
}

#[tokio::test]
async fn start_runs_every_starter_in_order() {
    let registry = Registry::new();
    let transport = StubTransport::default();
    registry.register_startup("db", transport.log.hook("db", Ok(())));
    registry.register_startup("cache", transport.log.hook("cache", Ok(())));
    let (orchestrator, log) = orchestrator(registry, transport);

    orchestrator.start(&Context::background()).await.unwrap();
    assert_eq!(log.calls(), vec!["transport:start", "db", "cache"]);
}

#[tokio::test]
async fn start_stops_at_first_failure() {
    let registry = Registry::new();
    let transport = StubTransport::default();
    registry.register_startup("a", transport.log.hook("a", Err("a exploded")));
    registry.register_startup("b", transport.log.hook("b", Ok(())));
    let (orchestrator, log) = orchestrator(registry, transport);

    let err = orchestrator.start(&Context::background()).await.unwrap_err();
    match err {
        LifecycleError::Startup { name, source } => {
            assert_eq!(name, "a");
            assert_eq!(source.to_string(), "a exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(log.calls(), vec!["transport:start", "a"]);
}

#[tokio::test]
async fn transport_failure_prevents_starters() {
    let registry = Registry::new();
    let transport = StubTransport {
        fail_start: true,
        ..StubTransport::default()
    };
    registry.register_startup("a", transport.log.hook("a", Ok(())));
    let (orchestrator, log) = orchestrator(registry, transport);

    let err = orchestrator.start(&Context::background()).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Transport(TransportError::Bind { .. })
    ));
    assert_eq!(log.calls(), vec!["transport:start"]);
}

#[tokio::test]
async fn shutdown_continues_past_failures() {
    let registry = Registry::new();
    let transport = StubTransport::default();
    registry.register_shutdown("a", transport.log.hook("a", Err("a stuck")));
    registry.register_shutdown("b", transport.log.hook("b", Ok(())));
    let (orchestrator, log) = orchestrator(registry, transport);

    let err = orchestrator
        .shutdown(&Context::background())
        .await
        .unwrap_err();

    assert_eq!(log.calls(), vec!["transport:shutdown", "a", "b"]);
    assert_eq!(err.failed_names(), vec!["a"]);
    assert_eq!(err.to_string(), "shutdown incomplete: a failed: a stuck");
}

#[tokio::test]
async fn transport_shutdown_failure_still_runs_hooks() {
    let registry = Registry::new();
    let transport = StubTransport {
        fail_shutdown: true,
        ..StubTransport::default()
    };
    registry.register_shutdown("db", transport.log.hook("db", Ok(())));
    let (orchestrator, log) = orchestrator(registry, transport);

    let err = orchestrator
        .shutdown(&Context::background())
        .await
        .unwrap_err();
    assert_eq!(err.failed_names(), vec!["transport"]);
    assert_eq!(log.calls(), vec!["transport:shutdown", "db"]);
}

#[tokio::test]
async fn clean_shutdown_returns_ok() {
    let registry = Registry::new();
    let transport = StubTransport::default();
    registry.register_shutdown("db", transport.log.hook("db", Ok(())));
    let (orchestrator, _log) = orchestrator(registry, transport);

    assert!(orchestrator.shutdown(&Context::background()).await.is_ok());
}

#[tokio::test]
async fn http_bind_failure_is_fatal() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let config = ServerConfig {
        bind_address: occupied.local_addr().unwrap().to_string(),
        ..ServerConfig::default()
    };

    let registry = Registry::new();
    let log = CallLog::default();
    registry.register_startup("db", log.hook("db", Ok(())));
    let server = HttpServer::with_health(&config, HealthAggregator::new(registry.clone()), false);
    let orchestrator = Orchestrator::new(registry, server.clone());

    let err = orchestrator.start(&Context::background()).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Transport(TransportError::Bind { .. })
    ));
    assert!(log.calls().is_empty());
    assert!(matches!(
        server.shutdown(&Context::background()).await,
        Err(TransportError::NotStarted)
    ));
}
