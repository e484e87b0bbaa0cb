//! Span construction for health aggregation.
//!
//! Span and field names follow OpenTelemetry conventions so an
//! OpenTelemetry layer installed on the subscriber exports them as-is.

use tracing::field::Empty;
use tracing::Span;

use crate::health::error::HealthError;
use crate::health::probe::ProbeKind;

/// Span covering one liveness or readiness run.
pub fn aggregate_span(probe: ProbeKind, checks: usize) -> Span {
    tracing::info_span!(
        "health.aggregate",
        probe = probe.as_str(),
        checks,
        failed = Empty,
        otel.status_code = Empty
    )
}

/// Span covering one check inside an aggregate run.
pub fn check_span(probe: ProbeKind, check: &str) -> Span {
    tracing::info_span!(
        "health.check",
        probe = probe.as_str(),
        check,
        otel.status_code = Empty
    )
}

/// Mark `span` failed and emit one event per failing check, keyed by name.
pub fn record_health_error(span: &Span, err: &HealthError) {
    span.record("otel.status_code", "ERROR");
    span.record("failed", err.failures().len());
    span.in_scope(|| {
        for failure in err.failures() {
            tracing::error!(
                check = %failure.name,
                error = %failure.error,
                "Health check failed"
            );
        }
    });
}
