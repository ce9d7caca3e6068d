//! Per-reconcile deadline.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::PodwatchError;
use crate::types::ObjectKey;

/// Deadline shared by one reconciliation pass.
///
/// Long passes check [`ReconcileContext::expired`] between units of work and
/// stop early; work already published stays published.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext {
    deadline: Option<(Instant, Duration)>,
}

impl ReconcileContext {
    /// A context without a deadline.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { deadline: None }
    }

    /// A context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some((Instant::now() + timeout, timeout)),
        }
    }

    /// Returns true once the deadline has passed.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.deadline
            .is_some_and(|(deadline, _)| Instant::now() >= deadline)
    }

    /// Builds the timeout error for `key`.
    #[must_use]
    pub fn timeout_error(&self, key: &ObjectKey) -> PodwatchError {
        PodwatchError::Timeout {
            key: key.clone(),
            after: self.deadline.map_or(Duration::ZERO, |(_, timeout)| timeout),
        }
    }
}

impl Default for ReconcileContext {
    fn default() -> Self {
        Self::unbounded()
    }
}
