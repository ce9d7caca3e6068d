//! Certificate and pod fixtures.

use podwatch_core::{ContainerStatus, ObjectKey, PodState, SecretState, TerminationSnapshot};
use time::OffsetDateTime;

/// Linkerd identity issuer certificate (ECDSA P-256).
pub const ISSUER_PEM: &str =
    include_str!("../../podwatch-core/testdata/linkerd-issuer.pem");

/// NotBefore of [`ISSUER_PEM`] (2025-08-06T23:12:26Z) in Unix seconds.
pub const ISSUER_NOT_BEFORE: i64 = 1_754_521_946;

/// NotAfter of [`ISSUER_PEM`] (2035-08-04T23:12:26Z) in Unix seconds.
pub const ISSUER_NOT_AFTER: i64 = 2_069_881_946;

/// A well-formed PEM block whose body is not DER.
pub const NON_CERTIFICATE_PEM: &str = "-----BEGIN CERTIFICATE-----
bm90IGEgY2VydGlmaWNhdGU=
-----END CERTIFICATE-----
";

/// Default certificate subject.
#[must_use]
pub fn issuer_key() -> ObjectKey {
    ObjectKey::new("linkerd", "linkerd-identity-issuer")
}

/// [`ISSUER_PEM`] cut off halfway through its body.
#[must_use]
pub fn truncated_pem() -> String {
    ISSUER_PEM[..ISSUER_PEM.len() / 2].to_string()
}

/// NotAfter of [`ISSUER_PEM`].
#[must_use]
pub fn issuer_not_after() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(ISSUER_NOT_AFTER).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// The issuer secret with [`ISSUER_PEM`] under `cert_type`.
#[must_use]
pub fn issuer_secret(cert_type: &str) -> SecretState {
    let key = issuer_key();
    SecretState::new(key.namespace, key.name).with_entry(cert_type, ISSUER_PEM)
}

/// Builds a pod from its container statuses.
#[must_use]
pub fn pod(
    namespace: &str,
    name: &str,
    containers: impl IntoIterator<Item = ContainerStatus>,
) -> PodState {
    containers
        .into_iter()
        .fold(PodState::new(namespace, name), PodState::with_container)
}

/// Container status whose last termination has the given details.
#[must_use]
pub fn terminated(
    name: &str,
    restart_count: u32,
    reason: &str,
    exit_code: i32,
    finished_at: OffsetDateTime,
) -> ContainerStatus {
    ContainerStatus::running(name, restart_count).with_termination(TerminationSnapshot {
        reason: reason.to_string(),
        exit_code,
        finished_at,
    })
}
