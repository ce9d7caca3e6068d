//! Core types shared by the tracker, the watchers and the dispatcher.
//!
//! Object state is always fetched fresh from the cluster source; none of
//! these types are persisted.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Namespace/name pair identifying a cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Object namespace.
    pub namespace: String,
    /// Object name.
    pub name: String,
}

impl ObjectKey {
    /// Creates a new object key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Identity of a trackable container slot.
///
/// Used only as a map key inside the restart tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerIdentity {
    namespace: String,
    parent_name: String,
    container_name: String,
}

impl ContainerIdentity {
    /// Creates a new container identity.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        parent_name: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            parent_name: parent_name.into(),
            container_name: container_name.into(),
        }
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the owning pod name.
    #[must_use]
    pub fn parent_name(&self) -> &str {
        &self.parent_name
    }

    /// Returns the container name.
    #[must_use]
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Returns true if this identity belongs to the given parent object.
    #[must_use]
    pub fn belongs_to(&self, namespace: &str, parent_name: &str) -> bool {
        self.namespace == namespace && self.parent_name == parent_name
    }
}

impl std::fmt::Display for ContainerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.namespace, self.parent_name, self.container_name
        )
    }
}

/// Record of a container's last exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationSnapshot {
    /// Termination reason (e.g. `OOMKilled`, `Error`).
    pub reason: String,
    /// Process exit code.
    pub exit_code: i32,
    /// When the container finished.
    pub finished_at: OffsetDateTime,
}

/// Observed status of one container inside a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    /// Container name.
    pub name: String,
    /// Restart counter reported by the orchestrator.
    pub restart_count: u32,
    /// Last termination, if the orchestrator still reports one.
    pub last_termination: Option<TerminationSnapshot>,
}

impl ContainerStatus {
    /// Creates a status for a container that has never terminated.
    #[must_use]
    pub fn running(name: impl Into<String>, restart_count: u32) -> Self {
        Self {
            name: name.into(),
            restart_count,
            last_termination: None,
        }
    }

    /// Attaches a last-termination snapshot.
    #[must_use]
    pub fn with_termination(mut self, snapshot: TerminationSnapshot) -> Self {
        self.last_termination = Some(snapshot);
        self
    }
}

/// Current state of a pod as fetched from the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodState {
    /// Pod namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Per-container status list.
    pub container_statuses: Vec<ContainerStatus>,
}

impl PodState {
    /// Creates an empty pod state.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            container_statuses: Vec::new(),
        }
    }

    /// Adds a container status.
    #[must_use]
    pub fn with_container(mut self, status: ContainerStatus) -> Self {
        self.container_statuses.push(status);
        self
    }

    /// Returns the key of this pod.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// A container restart ready to be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartObservation {
    /// Container that restarted.
    pub identity: ContainerIdentity,
    /// Restart counter at the time of observation.
    pub restart_counter: u32,
    /// Termination reason.
    pub termination_reason: String,
    /// Process exit code.
    pub exit_code: i32,
    /// When the terminated container finished.
    pub finished_at: OffsetDateTime,
}

/// Current state of a secret as fetched from the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretState {
    /// Secret namespace.
    pub namespace: String,
    /// Secret name.
    pub name: String,
    /// Raw data entries.
    pub data: BTreeMap<String, Vec<u8>>,
}

impl SecretState {
    /// Creates an empty secret.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    /// Adds a data entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Raw certificate bytes from one slot of a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateKeyMaterial<'a> {
    /// Secret namespace.
    pub namespace: &'a str,
    /// Secret name.
    pub secret_name: &'a str,
    /// Logical slot name (the data key, e.g. `ca.crt`).
    pub cert_type: &'a str,
    /// PEM-encoded bytes.
    pub raw_bytes: &'a [u8],
}

/// Derived expiry of one certificate slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateExpiryFact {
    /// Secret namespace.
    pub namespace: String,
    /// Secret name.
    pub secret_name: String,
    /// Logical slot name.
    pub cert_type: String,
    /// Certificate NotAfter.
    pub expires_at: OffsetDateTime,
}

impl CertificateExpiryFact {
    /// Signed fractional days between `now` and expiry.
    ///
    /// Negative once the certificate has expired.
    #[must_use]
    pub fn days_remaining(&self, now: OffsetDateTime) -> f64 {
        (self.expires_at - now).as_seconds_f64() / SECONDS_PER_DAY
    }
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// What happened to the notification's subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Object was created or updated, or a timer fired.
    Changed,
    /// Object was deleted from the cluster.
    Deleted,
}

/// Change notification delivered by the watch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Notification {
    /// Subject of the notification.
    pub key: ObjectKey,
    /// Kind of change.
    pub kind: NotificationKind,
}

impl Notification {
    /// Creates a change notification.
    #[must_use]
    pub fn changed(key: ObjectKey) -> Self {
        Self {
            key,
            kind: NotificationKind::Changed,
        }
    }

    /// Creates a deletion notification.
    #[must_use]
    pub fn deleted(key: ObjectKey) -> Self {
        Self {
            key,
            kind: NotificationKind::Deleted,
        }
    }
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    /// Run again after this delay, even without a new notification.
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    /// No follow-up required.
    #[must_use]
    pub const fn done() -> Self {
        Self {
            requeue_after: None,
        }
    }

    /// Run again after `delay`.
    #[must_use]
    pub const fn requeue_after(delay: Duration) -> Self {
        Self {
            requeue_after: Some(delay),
        }
    }
}
