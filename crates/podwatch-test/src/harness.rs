//! Controller test harness.
//!
//! Wires a [`FakeCluster`], a [`GaugeRegistry`] and a [`FixedClock`] into a
//! running controller so tests can drive it through notifications and
//! inspect the published gauges.

use std::sync::Arc;
use std::time::Duration;

use podwatch_core::{
    CertificateConfig, CertificateWatcher, Controller, ControllerHandle, ControllerStats,
    FixedClock, GaugeRegistry, Notification, PodwatchConfig, ReconcileConfig,
    ReconcileDispatcher, RestartTracker,
};
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::cluster::FakeCluster;
use crate::error::{Result, TestError};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A running controller over fake collaborators.
pub struct ControllerTestHarness {
    cluster: Arc<FakeCluster>,
    registry: GaugeRegistry,
    tracker: Arc<RestartTracker>,
    clock: Arc<FixedClock>,
    handle: ControllerHandle,
}

impl ControllerTestHarness {
    /// Creates a new harness builder.
    #[must_use]
    pub fn builder() -> ControllerTestHarnessBuilder {
        ControllerTestHarnessBuilder::default()
    }

    /// The cluster the controller reads from.
    #[must_use]
    pub const fn cluster(&self) -> &Arc<FakeCluster> {
        &self.cluster
    }

    /// The registry the controller publishes to.
    #[must_use]
    pub const fn registry(&self) -> &GaugeRegistry {
        &self.registry
    }

    /// The restart tracker.
    #[must_use]
    pub const fn tracker(&self) -> &Arc<RestartTracker> {
        &self.tracker
    }

    /// The wall clock used for days-remaining.
    #[must_use]
    pub const fn clock(&self) -> &Arc<FixedClock> {
        &self.clock
    }

    /// Controller counters.
    #[must_use]
    pub const fn stats(&self) -> &ControllerStats {
        self.handle.stats()
    }

    /// The controller handle.
    #[must_use]
    pub const fn handle(&self) -> &ControllerHandle {
        &self.handle
    }

    /// Enqueues a notification.
    ///
    /// # Errors
    /// Returns an error if the controller has stopped.
    pub async fn notify(&self, notification: Notification) -> Result<()> {
        Ok(self.handle.notify(notification).await?)
    }

    /// Polls `condition` until it holds or `timeout` elapses.
    ///
    /// # Errors
    /// Returns [`TestError::Timeout`] if the condition never holds.
    pub async fn wait_for(
        &self,
        timeout: Duration,
        condition: impl Fn(&Self) -> bool,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if condition(self) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(TestError::Timeout(timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Stops the controller.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}

/// Builder for [`ControllerTestHarness`].
pub struct ControllerTestHarnessBuilder {
    certificate: CertificateConfig,
    reconcile: ReconcileConfig,
    now: OffsetDateTime,
    cluster: Option<Arc<FakeCluster>>,
}

impl Default for ControllerTestHarnessBuilder {
    fn default() -> Self {
        Self {
            certificate: CertificateConfig::default(),
            reconcile: ReconcileConfig::default(),
            now: OffsetDateTime::UNIX_EPOCH,
            cluster: None,
        }
    }
}

impl ControllerTestHarnessBuilder {
    /// Sets the certificate subject and recheck interval.
    #[must_use]
    pub fn with_certificate(mut self, config: CertificateConfig) -> Self {
        self.certificate = config;
        self
    }

    /// Sets the reconcile runtime settings.
    #[must_use]
    pub fn with_reconcile(mut self, config: ReconcileConfig) -> Self {
        self.reconcile = config;
        self
    }

    /// Pins the wall clock.
    #[must_use]
    pub const fn with_now(mut self, now: OffsetDateTime) -> Self {
        self.now = now;
        self
    }

    /// Uses a pre-populated cluster.
    #[must_use]
    pub fn with_cluster(mut self, cluster: Arc<FakeCluster>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Validates the settings and spawns the controller.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the settings do not validate.
    pub fn build(self) -> Result<ControllerTestHarness> {
        let config = PodwatchConfig {
            certificate: self.certificate,
            reconcile: self.reconcile,
            ..PodwatchConfig::default()
        };
        config
            .validate()
            .map_err(|e| TestError::harness(e.to_string()))?;

        let cluster = self.cluster.unwrap_or_default();
        let registry = GaugeRegistry::new();
        let tracker = Arc::new(RestartTracker::new());
        let clock = Arc::new(FixedClock::new(self.now));

        let watcher = CertificateWatcher::new(cluster.clone(), Arc::new(registry.clone()))
            .with_clock(clock.clone())
            .with_recheck_interval(config.certificate.recheck_interval);
        let dispatcher = ReconcileDispatcher::new(
            cluster.clone(),
            Arc::new(registry.clone()),
            Arc::clone(&tracker),
            config.certificate.subject(),
        )
        .with_certificate_watcher(watcher);

        let handle = Controller::new(Arc::new(dispatcher), config.reconcile).spawn();

        Ok(ControllerTestHarness {
            cluster,
            registry,
            tracker,
            clock,
            handle,
        })
    }
}
