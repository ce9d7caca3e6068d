//! podwatch: container restart and certificate expiry metrics for Kubernetes.
//!
//! Wires the reconcile engine from [`podwatch_core`] to the Prometheus
//! exposition in [`podwatch_observe`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use podwatch::prelude::*;
//!
//! let config = PodwatchConfig::load("podwatch.toml")?;
//! podwatch::observe::logging::init(&config.logging)?;
//!
//! let podwatch = Podwatch::start(config, cluster)?;
//! podwatch.notify(Notification::changed(ObjectKey::new("default", "web-0"))).await?;
//! println!("{}", podwatch.export()?);
//! podwatch.shutdown().await;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

pub use podwatch_core as core;
pub use podwatch_observe as observe;

use podwatch_core::{
    CertificateWatcher, ClusterSource, Controller, ControllerHandle, ControllerStats,
    GaugeRegistry, Notification, PodwatchConfig, ReconcileDispatcher, RestartTracker,
};
use podwatch_observe::PrometheusExporter;
use tracing::info;

/// A running podwatch instance.
pub struct Podwatch {
    registry: GaugeRegistry,
    exporter: PrometheusExporter,
    controller: ControllerHandle,
}

impl Podwatch {
    /// Validates `config` and starts the controller over `source`.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns a configuration error if `config` does not validate.
    pub fn start(
        config: PodwatchConfig,
        source: Arc<dyn ClusterSource>,
    ) -> podwatch_core::Result<Self> {
        config.validate()?;

        let registry = GaugeRegistry::new();
        let sink = Arc::new(registry.clone());
        let subject = config.certificate.subject();
        let watcher = CertificateWatcher::new(Arc::clone(&source), sink.clone())
            .with_recheck_interval(config.certificate.recheck_interval);
        let tracker = Arc::new(RestartTracker::new());
        let dispatcher = ReconcileDispatcher::new(source, sink, tracker, subject.clone())
            .with_certificate_watcher(watcher);

        let exporter = PrometheusExporter::new(registry.clone(), &config.export);
        let controller = Controller::new(Arc::new(dispatcher), config.reconcile).spawn();

        info!(certificate = %subject, "podwatch started");
        Ok(Self {
            registry,
            exporter,
            controller,
        })
    }

    /// Enqueues a change notification.
    ///
    /// # Errors
    /// Returns an error once the controller has stopped.
    pub async fn notify(&self, notification: Notification) -> podwatch_core::Result<()> {
        self.controller.notify(notification).await
    }

    /// Renders the current gauges in Prometheus text format.
    ///
    /// # Errors
    /// Returns an error if formatting fails.
    pub fn export(&self) -> podwatch_observe::Result<String> {
        self.exporter.export()
    }

    /// The gauge registry.
    #[must_use]
    pub const fn registry(&self) -> &GaugeRegistry {
        &self.registry
    }

    /// Controller counters.
    #[must_use]
    pub const fn stats(&self) -> &ControllerStats {
        self.controller.stats()
    }

    /// Stops the controller and waits for it to finish.
    pub async fn shutdown(self) {
        self.controller.shutdown().await;
        info!("podwatch stopped");
    }
}

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::Podwatch;
    pub use podwatch_core::{
        ClusterSource, GaugeRegistry, MetricSink, Notification, ObjectKey, PodState,
        PodwatchConfig, PodwatchError, SecretState,
    };
    pub use podwatch_observe::PrometheusExporter;
}
