//! Probe endpoint handlers.
//!
//! Map `Ok` to 200 and `Err` to 503 with a minimal JSON body. Per-check
//! detail stays in logs and spans unless the server runs verbose.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::health::{HealthError, ProbeKind};
use crate::http::server::AppState;
use crate::lifecycle::context::Context;

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<Vec<String>>,
}

pub async fn livez(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    probe(&state, ProbeKind::Liveness).await
}

pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    probe(&state, ProbeKind::Readiness).await
}

async fn probe(state: &AppState, kind: ProbeKind) -> (StatusCode, Json<ProbeResponse>) {
    let ctx = Context::background().with_timeout(state.probe_timeout);
    let _release = ctx.cancel_on_drop();

    match state.health.check(kind, &ctx).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ProbeResponse {
                status: "ok",
                failed: None,
            }),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(unavailable(&err, state.verbose)),
        ),
    }
}

fn unavailable(err: &HealthError, verbose: bool) -> ProbeResponse {
    ProbeResponse {
        status: "unavailable",
        failed: verbose.then(|| err.failed_names().into_iter().map(String::from).collect()),
    }
}
