//! Certificate expiry reconciliation for one secret.
//!
//! The watcher keeps no state between passes: every reconcile fetches the
//! secret, evaluates each recognized certificate slot and overwrites the two
//! expiry gauges. When the secret is gone its series are deleted.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cert;
use crate::clock::{Clock, SystemClock};
use crate::context::ReconcileContext;
use crate::error::Result;
use crate::sink::{
    CERTIFICATE_DAYS_UNTIL_EXPIRATION, CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS, LabelSet,
    MetricSink,
};
use crate::source::ClusterSource;
use crate::types::{CertificateExpiryFact, CertificateKeyMaterial, ObjectKey, ReconcileOutcome};

/// Secret data keys that hold certificates. Any other key is ignored.
pub const CERTIFICATE_KEYS: [&str; 5] = ["ca.crt", "issuer.crt", "ca.pem", "issuer.pem", "crt.pem"];

/// Default interval between time-driven rechecks.
pub const DEFAULT_RECHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Republishes certificate expiry for a secret.
pub struct CertificateWatcher {
    source: Arc<dyn ClusterSource>,
    sink: Arc<dyn MetricSink>,
    clock: Arc<dyn Clock>,
    recheck_interval: Duration,
}

impl CertificateWatcher {
    /// Creates a watcher using the system clock and a one-hour recheck.
    #[must_use]
    pub fn new(source: Arc<dyn ClusterSource>, sink: Arc<dyn MetricSink>) -> Self {
        Self {
            source,
            sink,
            clock: Arc::new(SystemClock),
            recheck_interval: DEFAULT_RECHECK_INTERVAL,
        }
    }

    /// Replaces the clock used for days-remaining.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the recheck interval.
    #[must_use]
    pub const fn with_recheck_interval(mut self, interval: Duration) -> Self {
        self.recheck_interval = interval;
        self
    }

    /// Returns the recheck interval.
    #[must_use]
    pub const fn recheck_interval(&self) -> Duration {
        self.recheck_interval
    }

    /// Reconciles the secret named by `key`.
    ///
    /// A malformed slot is logged and skipped; it never fails the pass.
    /// Every successful pass, including the not-found cleanup, asks to be
    /// requeued after the recheck interval.
    ///
    /// # Errors
    /// Returns [`PodwatchError::Fetch`] if the secret cannot be read and
    /// [`PodwatchError::Timeout`] if `ctx` expires between slots.
    ///
    /// [`PodwatchError::Fetch`]: crate::error::PodwatchError::Fetch
    /// [`PodwatchError::Timeout`]: crate::error::PodwatchError::Timeout
    pub async fn reconcile(
        &self,
        key: &ObjectKey,
        ctx: &ReconcileContext,
    ) -> Result<ReconcileOutcome> {
        let secret = match self.source.get_secret(key).await {
            Ok(secret) => secret,
            Err(e) if e.is_not_found() => {
                let removed = self.clear(key);
                info!(secret = %key, removed, "secret gone, cleared certificate metrics");
                return Ok(ReconcileOutcome::requeue_after(self.recheck_interval));
            }
            Err(e) => return Err(e),
        };

        let now = self.clock.now();
        for (cert_type, raw_bytes) in &secret.data {
            if !CERTIFICATE_KEYS.contains(&cert_type.as_str()) {
                debug!(secret = %key, key = %cert_type, "ignoring non-certificate key");
                continue;
            }
            if ctx.expired() {
                warn!(secret = %key, "deadline reached, abandoning remaining certificate keys");
                return Err(ctx.timeout_error(key));
            }

            let material = CertificateKeyMaterial {
                namespace: &key.namespace,
                secret_name: &key.name,
                cert_type,
                raw_bytes,
            };
            match evaluate_material(&material) {
                Ok(fact) => {
                    let days_remaining = fact.days_remaining(now);
                    info!(
                        namespace = %fact.namespace,
                        secret = %fact.secret_name,
                        cert_type = %fact.cert_type,
                        expiration_time = %fact.expires_at,
                        days_until_expiration = days_remaining,
                        "certificate expiration info"
                    );
                    self.publish(&fact, days_remaining);
                }
                Err(e) => {
                    warn!(
                        namespace = %key.namespace,
                        secret = %key.name,
                        cert_type = %cert_type,
                        error = %e,
                        "failed to check certificate expiration"
                    );
                }
            }
        }

        Ok(ReconcileOutcome::requeue_after(self.recheck_interval))
    }

    fn publish(&self, fact: &CertificateExpiryFact, days_remaining: f64) {
        let labels = LabelSet::new()
            .with("namespace", fact.namespace.as_str())
            .with("secret_name", fact.secret_name.as_str())
            .with("cert_type", fact.cert_type.as_str());
        self.sink.set(
            CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS,
            labels.clone(),
            fact.expires_at.unix_timestamp() as f64,
        );
        self.sink
            .set(CERTIFICATE_DAYS_UNTIL_EXPIRATION, labels, days_remaining);
    }

    fn clear(&self, key: &ObjectKey) -> usize {
        let subset = LabelSet::new()
            .with("namespace", key.namespace.as_str())
            .with("secret_name", key.name.as_str());
        self.sink
            .delete_partial_match(CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS, &subset)
            + self
                .sink
                .delete_partial_match(CERTIFICATE_DAYS_UNTIL_EXPIRATION, &subset)
    }
}

/// Evaluates one certificate slot into an expiry fact.
///
/// # Errors
/// Propagates [`cert::evaluate`] errors.
pub fn evaluate_material(material: &CertificateKeyMaterial<'_>) -> Result<CertificateExpiryFact> {
    let expires_at = cert::evaluate(material.raw_bytes)?;
    Ok(CertificateExpiryFact {
        namespace: material.namespace.to_string(),
        secret_name: material.secret_name.to_string(),
        cert_type: material.cert_type.to_string(),
        expires_at,
    })
}
