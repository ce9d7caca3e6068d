//! Notification routing.
//!
//! One configured namespace/name pair is the certificate subject; every
//! other notification is treated as a pod and goes through the restart
//! tracker.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::context::ReconcileContext;
use crate::error::Result;
use crate::sink::{CONTAINER_LAST_TERMINATION_INFO, LabelSet, MetricSink};
use crate::source::ClusterSource;
use crate::tracker::RestartTracker;
use crate::types::{Notification, NotificationKind, ObjectKey, ReconcileOutcome, RestartObservation};
use crate::watcher::CertificateWatcher;

/// Path a notification is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Certificate expiry reconciliation.
    Certificate,
    /// Container restart reconciliation.
    PodRestart,
}

/// Routes change notifications to the restart or certificate path.
pub struct ReconcileDispatcher {
    certificate_subject: ObjectKey,
    source: Arc<dyn ClusterSource>,
    sink: Arc<dyn MetricSink>,
    tracker: Arc<RestartTracker>,
    certificates: CertificateWatcher,
}

impl ReconcileDispatcher {
    /// Creates a dispatcher with a default certificate watcher.
    #[must_use]
    pub fn new(
        source: Arc<dyn ClusterSource>,
        sink: Arc<dyn MetricSink>,
        tracker: Arc<RestartTracker>,
        certificate_subject: ObjectKey,
    ) -> Self {
        let certificates = CertificateWatcher::new(Arc::clone(&source), Arc::clone(&sink));
        Self {
            certificate_subject,
            source,
            sink,
            tracker,
            certificates,
        }
    }

    /// Replaces the certificate watcher.
    #[must_use]
    pub fn with_certificate_watcher(mut self, watcher: CertificateWatcher) -> Self {
        self.certificates = watcher;
        self
    }

    /// Returns the restart tracker.
    #[must_use]
    pub const fn tracker(&self) -> &Arc<RestartTracker> {
        &self.tracker
    }

    /// Returns the certificate subject.
    #[must_use]
    pub const fn certificate_subject(&self) -> &ObjectKey {
        &self.certificate_subject
    }

    /// Classifies a notification subject.
    #[must_use]
    pub fn route(&self, key: &ObjectKey) -> Route {
        if *key == self.certificate_subject {
            Route::Certificate
        } else {
            Route::PodRestart
        }
    }

    /// Handles one notification.
    ///
    /// # Errors
    /// Returns retryable errors (fetch failures, deadline expiry). A missing
    /// object is never an error.
    pub async fn dispatch(
        &self,
        notification: &Notification,
        ctx: &ReconcileContext,
    ) -> Result<ReconcileOutcome> {
        let key = &notification.key;
        let route = self.route(key);
        debug!(%key, ?route, kind = ?notification.kind, "dispatching notification");

        match (route, notification.kind) {
            (Route::Certificate, _) => self.certificates.reconcile(key, ctx).await,
            (Route::PodRestart, NotificationKind::Changed) => self.reconcile_pod(key, ctx).await,
            (Route::PodRestart, NotificationKind::Deleted) => {
                let evicted = self.tracker.evict(&key.namespace, &key.name);
                debug!(pod = %key, evicted, "pod deleted, evicted restart state");
                Ok(ReconcileOutcome::done())
            }
        }
    }

    async fn reconcile_pod(
        &self,
        key: &ObjectKey,
        ctx: &ReconcileContext,
    ) -> Result<ReconcileOutcome> {
        let pod = match self.source.get_pod(key).await {
            Ok(pod) => pod,
            Err(e) if e.is_not_found() => return Ok(ReconcileOutcome::done()),
            Err(e) => {
                error!(pod = %key, error = %e, "unable to fetch pod");
                return Err(e);
            }
        };

        for status in &pod.container_statuses {
            if ctx.expired() {
                return Err(ctx.timeout_error(key));
            }
            let Some(restart) = self.tracker.observe_status(&pod.namespace, &pod.name, status)
            else {
                continue;
            };
            info!(
                pod = %pod.name,
                container = %status.name,
                restart_count = status.restart_count,
                reason = %restart.termination_reason,
                "detected container restart"
            );
            self.publish_restart(&restart);
        }

        Ok(ReconcileOutcome::done())
    }

    fn publish_restart(&self, restart: &RestartObservation) {
        let labels = LabelSet::new()
            .with("namespace", restart.identity.namespace())
            .with("pod", restart.identity.parent_name())
            .with("container", restart.identity.container_name())
            .with("reason", restart.termination_reason.as_str())
            .with("exit_code", restart.exit_code.to_string());
        self.sink.set(
            CONTAINER_LAST_TERMINATION_INFO,
            labels,
            restart.finished_at.unix_timestamp() as f64,
        );
    }
}
