//! Falsification Tests: Category D - Controller runtime (F031-F040)
//!
//! Timer-driven behavior runs on tokio's paused clock.

use std::time::Duration;

use podwatch_core::{
    BackoffConfig, CERTIFICATE_DAYS_UNTIL_EXPIRATION, CONTAINER_LAST_TERMINATION_INFO,
    CertificateConfig, LabelSet, Notification, ObjectKey, PodState, ReconcileConfig,
};
use podwatch_test::fixtures::{issuer_key, issuer_secret, pod, terminated};
use podwatch_test::{ChaosConfig, ControllerTestHarness};
use time::macros::datetime;

const HOUR: Duration = Duration::from_secs(3600);

/// F031: The certificate subject is rechecked without new notifications
#[tokio::test(start_paused = true)]
async fn f031_hourly_recheck_without_notification() {
    let harness = ControllerTestHarness::builder()
        .with_now(datetime!(2026-10-18 00:00 UTC))
        .build()
        .unwrap();
    harness.cluster().put_secret(issuer_secret("ca.crt"));
    harness.notify(Notification::changed(issuer_key())).await.unwrap();

    harness
        .wait_for(Duration::from_secs(1), |h| h.cluster().secret_fetches() == 1)
        .await
        .unwrap();

    // Advance the wall clock a day; only a timer-driven pass can observe it.
    let labels = LabelSet::new().with("cert_type", "ca.crt");
    let before = harness.registry().find(CERTIFICATE_DAYS_UNTIL_EXPIRATION, &labels)[0].1;
    harness.clock().set(datetime!(2026-10-19 00:00 UTC));

    tokio::time::sleep(HOUR + Duration::from_secs(1)).await;

    assert_eq!(
        harness.cluster().secret_fetches(),
        2,
        "FALSIFIED: no recheck after the interval"
    );
    let after = harness.registry().find(CERTIFICATE_DAYS_UNTIL_EXPIRATION, &labels)[0].1;
    assert!((before - after - 1.0).abs() < 1e-9);

    harness.shutdown().await;
}

/// F032: The recheck interval comes from configuration
#[tokio::test(start_paused = true)]
async fn f032_configured_recheck_interval() {
    let harness = ControllerTestHarness::builder()
        .with_certificate(CertificateConfig {
            recheck_interval: Duration::from_secs(60),
            ..CertificateConfig::default()
        })
        .build()
        .unwrap();
    harness.cluster().put_secret(issuer_secret("ca.crt"));
    harness.notify(Notification::changed(issuer_key())).await.unwrap();

    tokio::time::sleep(Duration::from_secs(150)).await;

    assert_eq!(harness.cluster().secret_fetches(), 3);
    harness.shutdown().await;
}

/// F033: Fetch failures are retried with growing delay
#[tokio::test(start_paused = true)]
async fn f033_fetch_failures_backoff() {
    let harness = ControllerTestHarness::builder()
        .with_reconcile(ReconcileConfig {
            backoff: BackoffConfig::default()
                .with_initial_delay(Duration::from_secs(1))
                .with_multiplier(2.0),
            ..ReconcileConfig::default()
        })
        .build()
        .unwrap();
    let key = ObjectKey::new("default", "web-0");
    harness.cluster().put_pod(pod(
        "default",
        "web-0",
        [terminated("app", 1, "Error", 1, datetime!(2026-10-18 08:00 UTC))],
    ));
    harness.cluster().inject(ChaosConfig::errors(3));
    harness.notify(Notification::changed(key)).await.unwrap();

    // Attempts at 0s, 1s, 3s fail; 7s succeeds.
    tokio::time::sleep(Duration::from_millis(6500)).await;
    assert_eq!(harness.cluster().pod_fetches(), 3, "FALSIFIED: retries not spaced out");
    assert_eq!(harness.registry().series_count(CONTAINER_LAST_TERMINATION_INFO), 0);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.cluster().pod_fetches(), 4);
    assert_eq!(harness.registry().series_count(CONTAINER_LAST_TERMINATION_INFO), 1);
    assert_eq!(harness.stats().retries_scheduled(), 3);

    harness.shutdown().await;
}

/// F034: A pod that does not exist is never retried
#[tokio::test(start_paused = true)]
async fn f034_not_found_never_retried() {
    let harness = ControllerTestHarness::builder().build().unwrap();
    harness
        .notify(Notification::changed(ObjectKey::new("default", "ghost")))
        .await
        .unwrap();

    tokio::time::sleep(HOUR).await;

    assert_eq!(harness.cluster().pod_fetches(), 1);
    assert_eq!(harness.stats().retries_scheduled(), 0);
    assert_eq!(harness.stats().requeues_scheduled(), 0);
    harness.shutdown().await;
}

/// F035: Shutdown cancels pending timers and joins all tasks
#[tokio::test(start_paused = true)]
async fn f035_shutdown_cancels_timers() {
    let harness = ControllerTestHarness::builder().build().unwrap();
    let cluster = harness.cluster().clone();
    cluster.put_secret(issuer_secret("ca.crt"));
    harness.notify(Notification::changed(issuer_key())).await.unwrap();
    harness
        .wait_for(Duration::from_secs(1), |h| h.stats().requeues_scheduled() == 1)
        .await
        .unwrap();

    harness.shutdown().await;
    tokio::time::sleep(HOUR * 3).await;

    assert_eq!(
        cluster.secret_fetches(),
        1,
        "FALSIFIED: recheck ran after shutdown"
    );
}

/// F036: Shutdown returns while a reconcile is still blocked
#[tokio::test(start_paused = true)]
async fn f036_shutdown_with_in_flight_reconcile() {
    let harness = ControllerTestHarness::builder().build().unwrap();
    harness.cluster().put_pod(PodState::new("default", "web-0"));
    harness.cluster().inject(ChaosConfig::latency(Duration::from_secs(20)));
    harness
        .notify(Notification::changed(ObjectKey::new("default", "web-0")))
        .await
        .unwrap();
    harness
        .wait_for(Duration::from_secs(1), |h| h.cluster().pod_fetches() == 1)
        .await
        .unwrap();

    let stats = harness.stats().clone();
    tokio::time::timeout(Duration::from_secs(1), harness.shutdown())
        .await
        .expect("FALSIFIED: shutdown waited for a blocked reconcile");
    assert_eq!(stats.reconciles_total(), 0);
}
