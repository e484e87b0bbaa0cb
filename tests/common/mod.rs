//! Shared hooks, checks and transports for integration tests.
#![allow(dead_code)]

use std::future::{self, Ready};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use service_lifecycle::lifecycle::{Context, HookResult, Transport, TransportError};

/// Check that always passes.
pub fn healthy() -> impl Fn(Context) -> Ready<HookResult> + Send + Sync + 'static {
    |_ctx: Context| future::ready(Ok(()))
}

/// Check that always fails with `message`.
pub fn failing(message: &'static str) -> impl Fn(Context) -> Ready<HookResult> + Send + Sync + 'static {
    move |_ctx: Context| future::ready(Err(message.into()))
}

/// Check that passes after `delay`, ignoring its context.
pub fn sleeping(delay: Duration) -> impl Fn(Context) -> BoxFuture<'static, HookResult> + Send + Sync + 'static {
    move |_ctx: Context| {
        async move {
            tokio::time::sleep(delay).await;
            Ok(())
        }
        .boxed()
    }
}

pub async fn exploding(_ctx: Context) -> HookResult {
    panic!("probe exploded")
}

/// Ordered record of which hooks ran.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Hook that records `name` and then returns `result`.
    pub fn hook(
        &self,
        name: &'static str,
        result: Result<(), &'static str>,
    ) -> impl Fn(Context) -> Ready<HookResult> + Send + Sync + 'static {
        let log = self.clone();
        move |_ctx: Context| {
            log.push(name);
            future::ready(result.map_err(Into::into))
        }
    }
}

/// Transport that only records calls.
#[derive(Debug, Default)]
pub struct StubTransport {
    pub fail_start: bool,
    pub fail_shutdown: bool,
    pub log: CallLog,
}

#[async_trait]
impl Transport for StubTransport {
    async fn start(&self) -> Result<(), TransportError> {
        self.log.push("transport:start");
        if self.fail_start {
            return Err(TransportError::Bind {
                address: "stub".into(),
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
            });
        }
        Ok(())
    }

    async fn shutdown(&self, _ctx: &Context) -> Result<(), TransportError> {
        self.log.push("transport:shutdown");
        if self.fail_shutdown {
            return Err(TransportError::NotStarted);
        }
        Ok(())
    }
}
