//! In-memory cluster source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use podwatch_core::{ClusterSource, ObjectKey, PodState, PodwatchError, Result, SecretState};
use tracing::debug;

use crate::chaos::ChaosConfig;

/// Cluster state held in memory, with injectable faults.
#[derive(Debug, Default)]
pub struct FakeCluster {
    pods: RwLock<HashMap<ObjectKey, PodState>>,
    secrets: RwLock<HashMap<ObjectKey, SecretState>>,
    chaos: RwLock<ChaosConfig>,
    pod_fetches: AtomicU32,
    secret_fetches: AtomicU32,
}

impl FakeCluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a pod.
    pub fn put_pod(&self, pod: PodState) {
        self.pods.write().insert(pod.key(), pod);
    }

    /// Removes a pod, returning it if it existed.
    pub fn remove_pod(&self, key: &ObjectKey) -> Option<PodState> {
        self.pods.write().remove(key)
    }

    /// Inserts or replaces a secret.
    pub fn put_secret(&self, secret: SecretState) {
        let key = ObjectKey::new(secret.namespace.clone(), secret.name.clone());
        self.secrets.write().insert(key, secret);
    }

    /// Removes a secret, returning it if it existed.
    pub fn remove_secret(&self, key: &ObjectKey) -> Option<SecretState> {
        self.secrets.write().remove(key)
    }

    /// Replaces the active faults.
    pub fn inject(&self, chaos: ChaosConfig) {
        *self.chaos.write() = chaos;
    }

    /// Clears all faults.
    pub fn heal(&self) {
        self.inject(ChaosConfig::default());
    }

    /// Pod fetches served, including failed ones.
    #[must_use]
    pub fn pod_fetches(&self) -> u32 {
        self.pod_fetches.load(Ordering::SeqCst)
    }

    /// Secret fetches served, including failed ones.
    #[must_use]
    pub fn secret_fetches(&self) -> u32 {
        self.secret_fetches.load(Ordering::SeqCst)
    }

    async fn apply_chaos(&self, key: &ObjectKey) -> Result<()> {
        let latency = self.chaos.read().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let fail = {
            let mut chaos = self.chaos.write();
            if chaos.fetch_failures > 0 {
                chaos.fetch_failures -= 1;
                true
            } else {
                false
            }
        };
        if fail {
            debug!(%key, "injecting fetch failure");
            return Err(PodwatchError::fetch(key.clone(), "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterSource for FakeCluster {
    async fn get_pod(&self, key: &ObjectKey) -> Result<PodState> {
        self.pod_fetches.fetch_add(1, Ordering::SeqCst);
        self.apply_chaos(key).await?;
        self.pods
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| PodwatchError::NotFound(key.clone()))
    }

    async fn get_secret(&self, key: &ObjectKey) -> Result<SecretState> {
        self.secret_fetches.fetch_add(1, Ordering::SeqCst);
        self.apply_chaos(key).await?;
        self.secrets
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| PodwatchError::NotFound(key.clone()))
    }
}
