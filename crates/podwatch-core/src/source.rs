//! Read access to current cluster state.
//!
//! Implementations wrap whatever API client the deployment uses. A missing
//! object is reported as [`PodwatchError::NotFound`]; every other lookup
//! failure as [`PodwatchError::Fetch`].
//!
//! [`PodwatchError::NotFound`]: crate::error::PodwatchError::NotFound
//! [`PodwatchError::Fetch`]: crate::error::PodwatchError::Fetch

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ObjectKey, PodState, SecretState};

/// Fetches the current state of watched objects.
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Fetches the pod named by `key`.
    async fn get_pod(&self, key: &ObjectKey) -> Result<PodState>;

    /// Fetches the secret named by `key`.
    async fn get_secret(&self, key: &ObjectKey) -> Result<SecretState>;
}
