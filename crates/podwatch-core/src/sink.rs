//! Metric sink contract and the metric families podwatch publishes.
//!
//! Metric names and label names are the wire contract with the monitoring
//! backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Last termination of a container; value is the finish time in Unix seconds.
pub const CONTAINER_LAST_TERMINATION_INFO: &str = "container_last_termination_info";

/// Certificate NotAfter in Unix seconds.
pub const CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS: &str =
    "certificate_expiration_timestamp_seconds";

/// Signed fractional days until the certificate expires.
pub const CERTIFICATE_DAYS_UNTIL_EXPIRATION: &str = "certificate_days_until_expiration";

/// Description of a gauge family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeDesc {
    /// Metric name.
    pub name: &'static str,
    /// Help text.
    pub help: &'static str,
    /// Label names, in declaration order.
    pub labels: &'static [&'static str],
}

/// Every family podwatch publishes.
pub const GAUGES: [GaugeDesc; 3] = [
    GaugeDesc {
        name: CONTAINER_LAST_TERMINATION_INFO,
        help: "Exposes information about the last termination of a container. The value is the unix timestamp of the termination.",
        labels: &["namespace", "pod", "container", "reason", "exit_code"],
    },
    GaugeDesc {
        name: CERTIFICATE_EXPIRATION_TIMESTAMP_SECONDS,
        help: "Unix timestamp in seconds indicating when the certificate will expire",
        labels: &["namespace", "secret_name", "cert_type"],
    },
    GaugeDesc {
        name: CERTIFICATE_DAYS_UNTIL_EXPIRATION,
        help: "Number of days until the certificate expires",
        labels: &["namespace", "secret_name", "cert_type"],
    },
];

/// Canonical label set: label names sorted, one value each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Creates an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a label.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Returns the value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns true if every label in `subset` has the same value here.
    #[must_use]
    pub fn matches(&self, subset: &Self) -> bool {
        subset
            .0
            .iter()
            .all(|(name, value)| self.0.get(name) == Some(value))
    }

    /// Iterates labels in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Receiver of labeled numeric observations.
///
/// Implementations must tolerate concurrent calls from many reconciles.
pub trait MetricSink: Send + Sync {
    /// Sets the gauge `metric{labels}` to `value`.
    fn set(&self, metric: &str, labels: LabelSet, value: f64);

    /// Deletes every observation of `metric` whose labels contain `subset`.
    ///
    /// Returns the number of observations removed.
    fn delete_partial_match(&self, metric: &str, subset: &LabelSet) -> usize;
}
