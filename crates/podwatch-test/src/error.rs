//! Test error types.

/// Result type alias for test operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Testing errors.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// Harness error.
    #[error("harness error: {0}")]
    Harness(String),

    /// Condition not met in time.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Core reconcile error.
    #[error("reconcile error: {0}")]
    Reconcile(#[from] podwatch_core::PodwatchError),
}

impl TestError {
    /// Creates a harness error.
    #[must_use]
    pub fn harness(msg: impl Into<String>) -> Self {
        Self::Harness(msg.into())
    }
}
