//! Falsification Tests: Category C - Dispatch (F021-F030)

use std::sync::Arc;

use podwatch_core::{
    CONTAINER_LAST_TERMINATION_INFO, ContainerStatus, GaugeRegistry, LabelSet, Notification,
    ObjectKey, PodwatchError, ReconcileContext, ReconcileDispatcher, RestartTracker, Route,
};
use podwatch_test::fixtures::{issuer_key, issuer_secret, pod, terminated};
use podwatch_test::{ChaosConfig, FakeCluster};
use time::macros::datetime;

fn dispatcher() -> (Arc<FakeCluster>, GaugeRegistry, ReconcileDispatcher) {
    let cluster = Arc::new(FakeCluster::new());
    let registry = GaugeRegistry::new();
    let dispatcher = ReconcileDispatcher::new(
        cluster.clone(),
        Arc::new(registry.clone()),
        Arc::new(RestartTracker::new()),
        issuer_key(),
    );
    (cluster, registry, dispatcher)
}

fn web0() -> ObjectKey {
    ObjectKey::new("default", "web-0")
}

async fn dispatch(dispatcher: &ReconcileDispatcher, notification: Notification) {
    dispatcher
        .dispatch(&notification, &ReconcileContext::unbounded())
        .await
        .unwrap();
}

/// F021: Sequence [0->1 snapshot, 1->2 none, 2->2, 2->3 snapshot] yields two series
#[tokio::test]
async fn f021_restart_sequence_two_series() {
    let (cluster, registry, dispatcher) = dispatcher();
    let t1 = datetime!(2026-10-18 08:00 UTC);
    let t3 = datetime!(2026-10-18 09:30 UTC);
    let steps = [
        ContainerStatus::running("app", 0),
        terminated("app", 1, "OOMKilled", 137, t1),
        ContainerStatus::running("app", 2),
        ContainerStatus::running("app", 2),
        terminated("app", 3, "Error", 1, t3),
    ];

    for status in steps {
        cluster.put_pod(pod("default", "web-0", [status]));
        dispatch(&dispatcher, Notification::changed(web0())).await;
    }

    let series = registry.find(CONTAINER_LAST_TERMINATION_INFO, &LabelSet::new());
    assert_eq!(series.len(), 2, "FALSIFIED: expected two series, got {series:?}");

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    assert!(values.contains(&(t1.unix_timestamp() as f64)));
    assert!(values.contains(&(t3.unix_timestamp() as f64)));
}

/// F022: Replaying identical pod state publishes nothing new
#[tokio::test]
async fn f022_replay_publishes_once() {
    let (cluster, registry, dispatcher) = dispatcher();
    cluster.put_pod(pod(
        "default",
        "web-0",
        [terminated("app", 1, "Error", 1, datetime!(2026-10-18 08:00 UTC))],
    ));

    for _ in 0..5 {
        dispatch(&dispatcher, Notification::changed(web0())).await;
    }

    assert_eq!(registry.series_count(CONTAINER_LAST_TERMINATION_INFO), 1);
    let identity = podwatch_core::ContainerIdentity::new("default", "web-0", "app");
    assert_eq!(dispatcher.tracker().prior(&identity), Some(1));
}

/// F023: Label values carry the termination details
#[tokio::test]
async fn f023_termination_labels() {
    let (cluster, registry, dispatcher) = dispatcher();
    let finished = datetime!(2026-10-18 08:00 UTC);
    cluster.put_pod(pod("prod", "api-7", [terminated("server", 2, "OOMKilled", 137, finished)]));

    dispatch(&dispatcher, Notification::changed(ObjectKey::new("prod", "api-7"))).await;

    let expected = LabelSet::new()
        .with("namespace", "prod")
        .with("pod", "api-7")
        .with("container", "server")
        .with("reason", "OOMKilled")
        .with("exit_code", "137");
    assert_eq!(
        registry.get(CONTAINER_LAST_TERMINATION_INFO, &expected),
        Some(finished.unix_timestamp() as f64),
        "FALSIFIED: labels or value do not describe the termination"
    );
}

/// F024: Routing sends only the configured subject to the certificate path
#[tokio::test]
async fn f024_certificate_subject_routed() {
    let (cluster, registry, dispatcher) = dispatcher();
    cluster.put_secret(issuer_secret("ca.crt"));
    // A pod sharing the secret's name in another namespace stays on the pod path.
    let lookalike = ObjectKey::new("default", "linkerd-identity-issuer");

    assert_eq!(dispatcher.route(&issuer_key()), Route::Certificate);
    assert_eq!(dispatcher.route(&lookalike), Route::PodRestart);

    dispatch(&dispatcher, Notification::changed(issuer_key())).await;
    dispatch(&dispatcher, Notification::changed(lookalike)).await;

    assert_eq!(cluster.secret_fetches(), 1);
    assert_eq!(cluster.pod_fetches(), 1);
    assert_eq!(registry.series_count(CONTAINER_LAST_TERMINATION_INFO), 0);
}

/// F025: A fetch failure surfaces from dispatch as retryable
#[tokio::test]
async fn f025_fetch_failure_surfaces() {
    let (cluster, _, dispatcher) = dispatcher();
    cluster.put_pod(pod("default", "web-0", [ContainerStatus::running("app", 0)]));
    cluster.inject(ChaosConfig::errors(1));

    let err = dispatcher
        .dispatch(&Notification::changed(web0()), &ReconcileContext::unbounded())
        .await
        .unwrap_err();
    assert!(matches!(err, PodwatchError::Fetch { .. }), "FALSIFIED: got {err:?}");
    assert!(err.is_retryable());
}

/// F026: A missing pod is success, not an error
#[tokio::test]
async fn f026_missing_pod_success() {
    let (_, _, dispatcher) = dispatcher();
    let outcome = dispatcher
        .dispatch(&Notification::changed(web0()), &ReconcileContext::unbounded())
        .await
        .unwrap();
    assert_eq!(outcome.requeue_after, None);
}

/// F027: A deleted pod forgets its containers; a recreated pod reports again
#[tokio::test]
async fn f027_deleted_pod_forgotten() {
    let (cluster, registry, dispatcher) = dispatcher();
    let t1 = datetime!(2026-10-18 08:00 UTC);
    cluster.put_pod(pod("default", "web-0", [terminated("app", 1, "Error", 1, t1)]));
    dispatch(&dispatcher, Notification::changed(web0())).await;

    cluster.remove_pod(&web0());
    dispatch(&dispatcher, Notification::deleted(web0())).await;
    assert!(dispatcher.tracker().is_empty());

    let t2 = datetime!(2026-10-18 10:00 UTC);
    cluster.put_pod(pod("default", "web-0", [terminated("app", 1, "Error", 1, t2)]));
    dispatch(&dispatcher, Notification::changed(web0())).await;

    let series = registry.find(CONTAINER_LAST_TERMINATION_INFO, &LabelSet::new());
    assert_eq!(series.len(), 1);
    assert_eq!(
        series[0].1,
        t2.unix_timestamp() as f64,
        "FALSIFIED: recreated pod's restart not reported"
    );
}
