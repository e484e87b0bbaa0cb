//! Health check error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::health::probe::ProbeKind;
use crate::lifecycle::hook::HookError;

/// Why a single health check failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The check returned an error.
    #[error("{0}")]
    Failed(#[source] HookError),

    /// The check did not finish within its timeout (or the caller's deadline).
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// The caller's context was cancelled while the check ran.
    #[error("context cancelled")]
    Cancelled,

    /// The check panicked; the panic was contained to its task.
    #[error("check panicked: {0}")]
    Panicked(String),

    /// The check task was aborted before it finished.
    #[error("check task aborted")]
    Aborted,
}

impl ProbeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::DeadlineExceeded(_))
    }

    /// The error returned by the check itself, if it returned one.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ProbeError::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A failed check attributed to the name it was registered under.
#[derive(Debug, Error)]
#[error("check {name} failed: {error}")]
pub struct CheckFailure {
    pub name: String,
    #[source]
    pub error: ProbeError,
}

impl CheckFailure {
    pub fn new(name: impl Into<String>, error: ProbeError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

/// Aggregate error for one liveness or readiness run.
///
/// Holds every failing check; each stays individually inspectable through
/// [`HealthError::failures`]. Failures are ordered by check name.
#[derive(Debug)]
pub struct HealthError {
    probe: ProbeKind,
    failures: Vec<CheckFailure>,
}

impl HealthError {
    pub(crate) fn new(probe: ProbeKind, mut failures: Vec<CheckFailure>) -> Self {
        failures.sort_by(|a, b| a.name.cmp(&b.name));
        Self { probe, failures }
    }

    pub fn probe(&self) -> ProbeKind {
        self.probe
    }

    pub fn failures(&self) -> &[CheckFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<CheckFailure> {
        self.failures
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.name.as_str()).collect()
    }

    /// Whether the check registered under `name` is among the failures.
    pub fn contains(&self, name: &str) -> bool {
        self.failures.iter().any(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ProbeError> {
        self.failures
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.error)
    }
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} probe failed: ", self.probe)?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for HealthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|f| f as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_joins_failures_in_name_order() {
        let err = HealthError::new(
            ProbeKind::Readiness,
            vec![
                CheckFailure::new("queue", ProbeError::Cancelled),
                CheckFailure::new("cache", ProbeError::Failed("cache down".into())),
            ],
        );

        assert_eq!(
            err.to_string(),
            "readiness probe failed: check cache failed: cache down; check queue failed: context cancelled"
        );
        assert_eq!(err.failed_names(), vec!["cache", "queue"]);
    }

    #[test]
    fn failure_exposes_original_cause() {
        let failure = CheckFailure::new("db", ProbeError::Failed("refused".into()));
        let source = failure.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("refused"));
        assert_eq!(
            failure.error.cause().map(|c| c.to_string()).as_deref(),
            Some("refused")
        );
    }
}
