//! Error types for podwatch-core.
//!
//! Every failure is either absorbed locally (certificate parse errors for a
//! single key) or surfaced as a retryable reconciliation failure. Nothing is
//! fatal to the process.

use std::time::Duration;

use crate::types::ObjectKey;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, PodwatchError>;

/// Error type for podwatch operations.
#[derive(Debug, thiserror::Error)]
pub enum PodwatchError {
    /// Object lookup failed for a reason other than not-found.
    #[error("failed to fetch {key}: {reason}")]
    Fetch {
        /// Object that could not be fetched.
        key: ObjectKey,
        /// Reason reported by the cluster source.
        reason: String,
    },

    /// Object does not exist. Triggers cleanup, never retried.
    #[error("object not found: {0}")]
    NotFound(ObjectKey),

    /// Key material did not contain a decodable PEM block.
    #[error("malformed key material: {0}")]
    MalformedInput(String),

    /// PEM block decoded but its contents are not an X.509 certificate.
    #[error("failed to parse certificate: {0}")]
    CertificateParse(String),

    /// Reconciliation exceeded its deadline.
    #[error("reconcile of {key} timed out after {after:?}")]
    Timeout {
        /// Object being reconciled.
        key: ObjectKey,
        /// Configured deadline.
        after: Duration,
    },

    /// Configuration error during load or validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// The controller is no longer accepting work.
    #[error("controller shut down")]
    Shutdown,
}

impl PodwatchError {
    /// Creates a fetch error.
    #[must_use]
    pub fn fetch(key: ObjectKey, reason: impl Into<String>) -> Self {
        Self::Fetch {
            key,
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a malformed input error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Creates a certificate parse error.
    #[must_use]
    pub fn certificate_parse(msg: impl Into<String>) -> Self {
        Self::CertificateParse(msg.into())
    }

    /// Returns true if the object simply does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the reconciliation should be retried with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Timeout { .. })
    }
}
