//! Restart deduplication.
//!
//! The tracker remembers the last restart counter reported for each
//! container so that every physical restart is published exactly once,
//! no matter how often the same pod state is replayed.
//!
//! A single `RwLock` guards the whole map. It is held for one
//! lookup-compare-and-set or one eviction sweep and never across an await
//! point.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{ContainerIdentity, ContainerStatus, RestartObservation};

/// Result of offering a restart counter to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// True if this call reported a restart that had not been seen before.
    pub is_new_event: bool,
    /// Counter stored before this call (0 for unseen identities).
    pub prior_counter: u32,
}

/// Concurrency-safe store of the last observed restart counter per container.
#[derive(Debug, Default)]
pub struct RestartTracker {
    state: RwLock<HashMap<ContainerIdentity, u32>>,
}

impl RestartTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a restart counter for `identity`.
    ///
    /// A restart is new when `candidate_counter` is strictly greater than the
    /// stored counter and a termination snapshot is available. New restarts
    /// update the stored counter before the lock is released. A counter
    /// increase without a snapshot is ignored until a later call carries one.
    pub fn observe(
        &self,
        identity: &ContainerIdentity,
        candidate_counter: u32,
        has_termination_snapshot: bool,
    ) -> Observation {
        if !has_termination_snapshot {
            let prior_counter = self.state.read().get(identity).copied().unwrap_or(0);
            return Observation {
                is_new_event: false,
                prior_counter,
            };
        }

        let mut state = self.state.write();
        match state.get_mut(identity) {
            Some(stored) => {
                let prior_counter = *stored;
                let is_new_event = candidate_counter > prior_counter;
                if is_new_event {
                    *stored = candidate_counter;
                }
                Observation {
                    is_new_event,
                    prior_counter,
                }
            }
            None => {
                let is_new_event = candidate_counter > 0;
                if is_new_event {
                    state.insert(identity.clone(), candidate_counter);
                }
                Observation {
                    is_new_event,
                    prior_counter: 0,
                }
            }
        }
    }

    /// Offers one container status of a pod and returns the restart to
    /// report, if any.
    pub fn observe_status(
        &self,
        namespace: &str,
        pod_name: &str,
        status: &ContainerStatus,
    ) -> Option<RestartObservation> {
        let identity = ContainerIdentity::new(namespace, pod_name, status.name.as_str());
        let observation = self.observe(
            &identity,
            status.restart_count,
            status.last_termination.is_some(),
        );
        if !observation.is_new_event {
            return None;
        }

        let termination = status.last_termination.as_ref()?;
        Some(RestartObservation {
            identity,
            restart_counter: status.restart_count,
            termination_reason: termination.reason.clone(),
            exit_code: termination.exit_code,
            finished_at: termination.finished_at,
        })
    }

    /// Drops every entry that belongs to the given parent object.
    ///
    /// Returns the number of entries removed.
    pub fn evict(&self, namespace: &str, parent_name: &str) -> usize {
        let mut state = self.state.write();
        let before = state.len();
        state.retain(|identity, _| !identity.belongs_to(namespace, parent_name));
        before - state.len()
    }

    /// Returns the stored counter for `identity`, if it has been observed.
    #[must_use]
    pub fn prior(&self, identity: &ContainerIdentity) -> Option<u32> {
        self.state.read().get(identity).copied()
    }

    /// Number of tracked containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }
}
