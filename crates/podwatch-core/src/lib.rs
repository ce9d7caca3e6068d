// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # podwatch-core
//!
//! Reconciliation engine that turns cluster state into monitoring metrics.
//!
//! This crate provides:
//!
//! - [`RestartTracker`] to report each container restart exactly once
//! - [`cert::evaluate`] to read certificate expiry from PEM key material
//! - [`CertificateWatcher`] to republish expiry for one secret
//! - [`ReconcileDispatcher`] to route change notifications
//! - [`Controller`] to drive the dispatcher with bounded concurrency,
//!   backoff and timed requeues
//! - [`GaugeRegistry`], the in-process [`MetricSink`]
//!
//! The cluster API and the metrics backend are collaborators behind the
//! [`ClusterSource`] and [`MetricSink`] traits.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use podwatch_core::{
//!     Controller, GaugeRegistry, Notification, ObjectKey, PodwatchConfig,
//!     ReconcileDispatcher, RestartTracker,
//! };
//!
//! let config = PodwatchConfig::default();
//! let registry = GaugeRegistry::new();
//! let dispatcher = ReconcileDispatcher::new(
//!     source,
//!     Arc::new(registry.clone()),
//!     Arc::new(RestartTracker::new()),
//!     config.certificate.subject(),
//! );
//! let controller = Controller::new(Arc::new(dispatcher), config.reconcile).spawn();
//! controller.notify(Notification::changed(ObjectKey::new("default", "web-0"))).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Allow significant_drop_tightening - overly aggressive for code with locks
#![allow(clippy::significant_drop_tightening)]

pub mod cert;
pub mod clock;
pub mod config;
pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod sink;
pub mod source;
pub mod tracker;
pub mod types;
pub mod watcher;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    BackoffConfig, CertificateConfig, ExportConfig, LogConfig, LogFormat, PodwatchConfig,
    ReconcileConfig,
};
pub use context::ReconcileContext;
pub use controller::{Controller, ControllerHandle, ControllerStats, StatsSnapshot};
pub use dispatcher::{ReconcileDispatcher, Route};
pub use error::{PodwatchError, Result};
pub use metrics::{FamilySnapshot, GaugeRegistry, RegistrySnapshot, Sample};
pub use sink::{
    CERTIFICATE_DAYS_UNTIL_EXPIRATION, CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS,
    CONTAINER_LAST_TERMINATION_INFO, GAUGES, GaugeDesc, LabelSet, MetricSink,
};
pub use source::ClusterSource;
pub use tracker::{Observation, RestartTracker};
pub use types::{
    CertificateExpiryFact, CertificateKeyMaterial, ContainerIdentity, ContainerStatus,
    Notification, NotificationKind, ObjectKey, PodState, ReconcileOutcome, RestartObservation,
    SecretState, TerminationSnapshot,
};
pub use watcher::{CERTIFICATE_KEYS, CertificateWatcher, DEFAULT_RECHECK_INTERVAL};
