//! Falsification Tests: Category E - Export (F041-F050)

use std::time::Duration;

use podwatch_core::{ExportConfig, Notification, ObjectKey};
use podwatch_observe::PrometheusExporter;
use podwatch_test::ControllerTestHarness;
use podwatch_test::fixtures::{ISSUER_NOT_AFTER, issuer_key, issuer_secret, pod, terminated};
use time::macros::datetime;

fn sample_value(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .find(|line| line.starts_with(series))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

/// F041: Published gauges appear in the exposition
#[tokio::test(start_paused = true)]
async fn f041_reconciled_state_exported() {
    let harness = ControllerTestHarness::builder()
        .with_now(datetime!(2026-10-18 00:00 UTC))
        .build()
        .unwrap();
    let finished = datetime!(2026-10-17 12:00 UTC);
    harness.cluster().put_secret(issuer_secret("issuer.crt"));
    harness
        .cluster()
        .put_pod(pod("default", "web-0", [terminated("app", 1, "OOMKilled", 137, finished)]));

    harness.notify(Notification::changed(issuer_key())).await.unwrap();
    harness
        .notify(Notification::changed(ObjectKey::new("default", "web-0")))
        .await
        .unwrap();
    harness
        .wait_for(Duration::from_secs(1), |h| h.stats().reconciles_total() == 2)
        .await
        .unwrap();

    let exporter = PrometheusExporter::new(harness.registry().clone(), &ExportConfig::default());
    let text = exporter.export().unwrap();

    assert_eq!(
        sample_value(
            &text,
            "certificate_expiration_timestamp_seconds{cert_type=\"issuer.crt\",namespace=\"linkerd\",secret_name=\"linkerd-identity-issuer\"}"
        ),
        Some(ISSUER_NOT_AFTER as f64),
        "FALSIFIED: expiry timestamp missing from exposition"
    );
    assert_eq!(
        sample_value(
            &text,
            "container_last_termination_info{container=\"app\",exit_code=\"137\",namespace=\"default\",pod=\"web-0\",reason=\"OOMKilled\"}"
        ),
        Some(finished.unix_timestamp() as f64),
        "FALSIFIED: termination series missing from exposition"
    );

    harness.shutdown().await;
}

/// F042: A configured prefix is applied to every family
#[tokio::test(start_paused = true)]
async fn f042_prefix_applies_to_all_families() {
    let harness = ControllerTestHarness::builder()
        .with_now(datetime!(2026-10-18 00:00 UTC))
        .build()
        .unwrap();
    let finished = datetime!(2026-10-17 12:00 UTC);
    harness.cluster().put_secret(issuer_secret("ca.crt"));
    harness
        .cluster()
        .put_pod(pod("default", "web-0", [terminated("app", 2, "Error", 1, finished)]));

    harness.notify(Notification::changed(issuer_key())).await.unwrap();
    harness
        .notify(Notification::changed(ObjectKey::new("default", "web-0")))
        .await
        .unwrap();
    harness
        .wait_for(Duration::from_secs(1), |h| h.stats().reconciles_total() == 2)
        .await
        .unwrap();

    let config = ExportConfig {
        prefix: Some("pod_monitor".into()),
    };
    let text = PrometheusExporter::new(harness.registry().clone(), &config)
        .export()
        .unwrap();

    let type_lines: Vec<_> = text.lines().filter(|l| l.starts_with("# TYPE")).collect();
    assert_eq!(type_lines.len(), 3);
    assert!(
        type_lines.iter().all(|l| l.starts_with("# TYPE pod_monitor_")),
        "FALSIFIED: unprefixed family in {type_lines:?}"
    );

    harness.shutdown().await;
}

/// F043: Families without samples are left out of the exposition
#[tokio::test(start_paused = true)]
async fn f043_empty_registry_exports_nothing() {
    let harness = ControllerTestHarness::builder().build().unwrap();
    let text = PrometheusExporter::new(harness.registry().clone(), &ExportConfig::default())
        .export()
        .unwrap();
    assert!(text.is_empty(), "FALSIFIED: empty families rendered: {text}");
    harness.shutdown().await;
}
