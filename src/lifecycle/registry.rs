//! Registry of startup hooks, shutdown hooks and health checks.
//!
//! Subsystems register themselves while they are being constructed; the
//! orchestrator and the health aggregator read the collections later.
//! The registry is an ordinary value passed to whoever needs it, and
//! every handle onto it (including the [`HookSet`]s it hands out) sees
//! the same live collections.

use std::future::Future;

use crate::health::probe::{Check, HealthzOptions, ProbeKind};
use crate::lifecycle::context::Context;
use crate::lifecycle::hook::{Hook, HookResult, HookSet};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    starters: HookSet<Hook>,
    shutdowners: HookSet<Hook>,
    liveness: HookSet<Check>,
    readiness: HookSet<Check>,
    healthz_defaults: HealthzOptions,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose [`Registry::register_healthz`] uses `defaults`
    /// instead of [`HealthzOptions::default`].
    pub fn with_healthz_defaults(defaults: HealthzOptions) -> Self {
        Self {
            healthz_defaults: defaults,
            ..Self::default()
        }
    }

    /// Register a hook to run once when the process starts.
    pub fn register_startup<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let name = name.into();
        if self.starters.insert(name.clone(), Hook::new(hook)) {
            tracing::debug!(hook = %name, "Replaced startup hook");
        } else {
            tracing::debug!(hook = %name, "Registered startup hook");
        }
    }

    /// Register a hook to run once when the process stops.
    pub fn register_shutdown<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let name = name.into();
        if self.shutdowners.insert(name.clone(), Hook::new(hook)) {
            tracing::debug!(hook = %name, "Replaced shutdown hook");
        } else {
            tracing::debug!(hook = %name, "Registered shutdown hook");
        }
    }

    /// Register a health check with the registry's default options.
    pub fn register_healthz<F, Fut>(&self, name: impl Into<String>, check: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.register_healthz_with(name, check, self.healthz_defaults);
    }

    /// Register a health check.
    ///
    /// The stored check is `check` bound to `opts`' timeout; it goes into the
    /// liveness set, the readiness set, or both, depending on `opts`. A
    /// previous check with the same name is dropped from any set `opts`
    /// no longer selects.
    pub fn register_healthz_with<F, Fut>(
        &self,
        name: impl Into<String>,
        check: F,
        opts: HealthzOptions,
    ) where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let name = name.into();
        let check = Check::wrap(check, opts.timeout_value());
        let probes = opts.probes_value();

        for kind in [ProbeKind::Liveness, ProbeKind::Readiness] {
            if probes.includes(kind) {
                self.checks(kind).insert(name.clone(), check.clone());
            } else {
                self.checks(kind).remove(&name);
            }
        }

        tracing::debug!(
            check = %name,
            timeout = ?opts.timeout_value(),
            probes = ?probes,
            "Registered health check"
        );
    }

    pub fn starters(&self) -> HookSet<Hook> {
        self.starters.clone()
    }

    pub fn shutdowners(&self) -> HookSet<Hook> {
        self.shutdowners.clone()
    }

    pub fn liveness_checks(&self) -> HookSet<Check> {
        self.liveness.clone()
    }

    pub fn readiness_checks(&self) -> HookSet<Check> {
        self.readiness.clone()
    }

    /// The check set answering `kind`.
    pub fn checks(&self, kind: ProbeKind) -> HookSet<Check> {
        match kind {
            ProbeKind::Liveness => self.liveness.clone(),
            ProbeKind::Readiness => self.readiness.clone(),
        }
    }

    pub fn healthz_defaults(&self) -> HealthzOptions {
        self.healthz_defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::Probes;
    use std::time::Duration;

    #[test]
    fn accessors_return_live_collections() {
        let registry = Registry::new();
        let starters = registry.starters();
        let readiness = registry.readiness_checks();

        registry.register_startup("db", |_ctx| async { Ok(()) });
        registry.register_healthz("db", |_ctx| async { Ok(()) });

        assert_eq!(starters.names(), vec!["db"]);
        assert_eq!(readiness.names(), vec!["db"]);
    }

    #[test]
    fn health_checks_land_in_selected_sets() {
        let registry = Registry::new();
        registry.register_healthz("both", |_ctx| async { Ok(()) });
        registry.register_healthz_with(
            "live-only",
            |_ctx| async { Ok(()) },
            HealthzOptions::default().probes(Probes::Liveness),
        );
        registry.register_healthz_with(
            "ready-only",
            |_ctx| async { Ok(()) },
            HealthzOptions::default().probes(Probes::Readiness),
        );

        assert_eq!(registry.liveness_checks().names(), vec!["both", "live-only"]);
        assert_eq!(registry.readiness_checks().names(), vec!["both", "ready-only"]);
    }

    #[test]
    fn narrower_reregistration_leaves_other_set() {
        let registry = Registry::new();
        registry.register_healthz("db", |_ctx| async { Ok(()) });
        registry.register_healthz_with(
            "db",
            |_ctx| async { Ok(()) },
            HealthzOptions::default().probes(Probes::Liveness),
        );

        assert_eq!(registry.liveness_checks().names(), vec!["db"]);
        assert!(registry.readiness_checks().is_empty());
    }

    #[test]
    fn timeout_is_bound_at_registration() {
        let registry = Registry::with_healthz_defaults(
            HealthzOptions::default().timeout(Duration::from_millis(750)),
        );
        registry.register_healthz("default", |_ctx| async { Ok(()) });
        registry.register_healthz_with(
            "custom",
            |_ctx| async { Ok(()) },
            HealthzOptions::default().timeout(Duration::from_secs(2)),
        );

        let checks = registry.readiness_checks();
        assert_eq!(
            checks.get("default").map(|c| c.timeout()),
            Some(Duration::from_millis(750))
        );
        assert_eq!(
            checks.get("custom").map(|c| c.timeout()),
            Some(Duration::from_secs(2))
        );
    }

    #[tokio::test]
    async fn reregistering_replaces_previous_hook() {
        let registry = Registry::new();
        registry.register_shutdown("cache", |_ctx| async { Err("old".into()) });
        registry.register_shutdown("cache", |_ctx| async { Ok(()) });

        let shutdowners = registry.shutdowners().snapshot();
        assert_eq!(shutdowners.len(), 1);
        assert!(shutdowners[0].hook.call(Context::background()).await.is_ok());
    }
}
