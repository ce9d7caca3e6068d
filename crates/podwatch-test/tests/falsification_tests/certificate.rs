//! Falsification Tests: Category B - Certificate evaluation (F011-F020)

use std::sync::Arc;

use podwatch_core::cert;
use podwatch_core::{
    CERTIFICATE_DAYS_UNTIL_EXPIRATION, CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS,
    CertificateExpiryFact, CertificateWatcher, FixedClock, GaugeRegistry, LabelSet, MetricSink,
    PodwatchError, ReconcileContext,
};
use podwatch_test::FakeCluster;
use podwatch_test::fixtures::{
    ISSUER_NOT_AFTER, ISSUER_PEM, NON_CERTIFICATE_PEM, issuer_key, issuer_not_after,
    issuer_secret, truncated_pem,
};
use proptest::prelude::*;
use time::OffsetDateTime;
use time::macros::datetime;

fn watcher_at(now: OffsetDateTime) -> (Arc<FakeCluster>, GaugeRegistry, CertificateWatcher) {
    let cluster = Arc::new(FakeCluster::new());
    let registry = GaugeRegistry::new();
    let watcher = CertificateWatcher::new(cluster.clone(), Arc::new(registry.clone()))
        .with_clock(Arc::new(FixedClock::new(now)));
    (cluster, registry, watcher)
}

fn labels(cert_type: &str) -> LabelSet {
    LabelSet::new()
        .with("namespace", "linkerd")
        .with("secret_name", "linkerd-identity-issuer")
        .with("cert_type", cert_type)
}

/// F011: evaluate returns the exact NotAfter of a known certificate
#[test]
fn f011_exact_not_after() {
    let expires_at = cert::evaluate(ISSUER_PEM.as_bytes()).unwrap();
    assert_eq!(
        expires_at,
        datetime!(2035-08-04 23:12:26 UTC),
        "FALSIFIED: NotAfter mismatch"
    );
    assert_eq!(expires_at.unix_timestamp(), ISSUER_NOT_AFTER);
}

/// F012: Non-PEM bytes are malformed input
#[test]
fn f012_non_pem_malformed() {
    for input in [&b""[..], b"hello", b"-----BEGIN CERTIFICATE-----\n"] {
        let err = cert::evaluate(input).unwrap_err();
        assert!(
            matches!(err, PodwatchError::MalformedInput(_)),
            "FALSIFIED: {input:?} gave {err:?}"
        );
    }
}

/// F013: PEM wrapping non-certificate DER is a certificate parse error
#[test]
fn f013_non_certificate_der() {
    let err = cert::evaluate(NON_CERTIFICATE_PEM.as_bytes()).unwrap_err();
    assert!(
        matches!(err, PodwatchError::CertificateParse(_)),
        "FALSIFIED: got {err:?}"
    );
}

/// F014: A truncated PEM never yields an expiry
#[test]
fn f014_truncated_pem_rejected() {
    assert!(cert::evaluate(truncated_pem().as_bytes()).is_err());
}

/// F015: One truncated key does not block the valid key in the same secret
#[tokio::test]
async fn f015_truncated_key_isolated() {
    let (cluster, registry, watcher) = watcher_at(datetime!(2026-10-18 00:00 UTC));
    cluster.put_secret(issuer_secret("ca.crt").with_entry("issuer.crt", truncated_pem()));

    let result = watcher
        .reconcile(&issuer_key(), &ReconcileContext::unbounded())
        .await;

    assert!(result.is_ok(), "FALSIFIED: truncated key failed the pass");
    assert!(registry.get(CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS, &labels("ca.crt")).is_some());
    assert!(registry.get(CERTIFICATE_DAYS_UNTIL_EXPIRATION, &labels("ca.crt")).is_some());
    assert!(
        registry
            .get(CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS, &labels("issuer.crt"))
            .is_none()
    );
    assert!(registry.get(CERTIFICATE_DAYS_UNTIL_EXPIRATION, &labels("issuer.crt")).is_none());
}

/// F016: A vanished secret loses exactly its own series
#[tokio::test]
async fn f016_secret_gone_clears_only_its_series() {
    let (cluster, registry, watcher) = watcher_at(datetime!(2026-10-18 00:00 UTC));
    cluster.put_secret(issuer_secret("ca.crt").with_entry("issuer.crt", ISSUER_PEM));
    watcher
        .reconcile(&issuer_key(), &ReconcileContext::unbounded())
        .await
        .unwrap();

    let other = LabelSet::new()
        .with("namespace", "linkerd")
        .with("secret_name", "linkerd-trust-anchor")
        .with("cert_type", "ca.crt");
    registry.set(CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS, other.clone(), 1.0);

    cluster.remove_secret(&issuer_key());
    watcher
        .reconcile(&issuer_key(), &ReconcileContext::unbounded())
        .await
        .unwrap();

    assert_eq!(registry.series_count(CERTIFICATE_DAYS_UNTIL_EXPIRATION), 0);
    assert_eq!(registry.series_count(CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS), 1);
    assert_eq!(
        registry.get(CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS, &other),
        Some(1.0),
        "FALSIFIED: another secret's series was deleted"
    );
}

/// F017: An expired certificate publishes negative days
#[tokio::test]
async fn f017_expired_negative_days() {
    let (cluster, registry, watcher) = watcher_at(datetime!(2035-08-05 23:12:26 UTC));
    cluster.put_secret(issuer_secret("crt.pem"));

    watcher
        .reconcile(&issuer_key(), &ReconcileContext::unbounded())
        .await
        .unwrap();

    let days = registry
        .get(CERTIFICATE_DAYS_UNTIL_EXPIRATION, &labels("crt.pem"))
        .unwrap();
    assert!((days + 1.0).abs() < 1e-9, "FALSIFIED: expected -1 day, got {days}");
}

proptest! {
    /// F018: days_remaining is (NotAfter - now) / 86400 for any now
    #[test]
    fn f018_days_remaining_formula(offset in -400_000_000i64..400_000_000) {
        let now = OffsetDateTime::from_unix_timestamp(ISSUER_NOT_AFTER + offset).unwrap();
        let fact = CertificateExpiryFact {
            namespace: "linkerd".into(),
            secret_name: "linkerd-identity-issuer".into(),
            cert_type: "ca.crt".into(),
            expires_at: issuer_not_after(),
        };
        let expected = -offset as f64 / 86_400.0;
        prop_assert!((fact.days_remaining(now) - expected).abs() < 1e-9);
    }

    /// F019: Arbitrary bytes never panic the evaluator
    #[test]
    fn f019_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = cert::evaluate(&bytes);
    }
}
