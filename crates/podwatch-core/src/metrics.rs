//! In-process gauge registry.
//!
//! Each family maps a canonical label set to a numeric cell. Partial-match
//! deletion is a linear scan filtered by label subset equality, which is
//! fine for the small cardinality podwatch produces.
//!
//! Thread-safe and cheap to clone; clones share the same cells.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::sink::{GAUGES, GaugeDesc, LabelSet, MetricSink};

/// Registry of gauge families.
#[derive(Debug, Clone)]
pub struct GaugeRegistry {
    inner: Arc<RwLock<HashMap<String, GaugeFamily>>>,
}

#[derive(Debug, Default)]
struct GaugeFamily {
    help: String,
    cells: HashMap<LabelSet, f64>,
}

impl GaugeRegistry {
    /// Creates a registry with podwatch's families pre-declared.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        for desc in &GAUGES {
            registry.declare(desc);
        }
        registry
    }

    /// Creates a registry with no declared families.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Declares a family so it is exported even before its first sample.
    pub fn declare(&self, desc: &GaugeDesc) {
        self.inner
            .write()
            .entry(desc.name.to_string())
            .or_default()
            .help = desc.help.to_string();
    }

    /// Returns the value of `metric{labels}`, if set.
    #[must_use]
    pub fn get(&self, metric: &str, labels: &LabelSet) -> Option<f64> {
        self.inner
            .read()
            .get(metric)
            .and_then(|family| family.cells.get(labels).copied())
    }

    /// Number of label sets recorded for `metric`.
    #[must_use]
    pub fn series_count(&self, metric: &str) -> usize {
        self.inner
            .read()
            .get(metric)
            .map_or(0, |family| family.cells.len())
    }

    /// Returns every label set of `metric` that contains `subset`.
    #[must_use]
    pub fn find(&self, metric: &str, subset: &LabelSet) -> Vec<(LabelSet, f64)> {
        let inner = self.inner.read();
        let mut found: Vec<_> = inner
            .get(metric)
            .into_iter()
            .flat_map(|family| family.cells.iter())
            .filter(|(labels, _)| labels.matches(subset))
            .map(|(labels, value)| (labels.clone(), *value))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    /// Creates a point-in-time snapshot, sorted by family and label set.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.inner.read();
        let mut families: Vec<_> = inner
            .iter()
            .map(|(name, family)| {
                let mut samples: Vec<_> = family
                    .cells
                    .iter()
                    .map(|(labels, value)| Sample {
                        labels: labels.clone(),
                        value: *value,
                    })
                    .collect();
                samples.sort_by(|a, b| a.labels.cmp(&b.labels));
                FamilySnapshot {
                    name: name.clone(),
                    help: family.help.clone(),
                    samples,
                }
            })
            .collect();
        families.sort_by(|a, b| a.name.cmp(&b.name));
        RegistrySnapshot { families }
    }
}

impl Default for GaugeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSink for GaugeRegistry {
    fn set(&self, metric: &str, labels: LabelSet, value: f64) {
        let mut inner = self.inner.write();
        inner
            .entry(metric.to_string())
            .or_default()
            .cells
            .insert(labels, value);
    }

    fn delete_partial_match(&self, metric: &str, subset: &LabelSet) -> usize {
        let mut inner = self.inner.write();
        let Some(family) = inner.get_mut(metric) else {
            return 0;
        };
        let before = family.cells.len();
        family.cells.retain(|labels, _| !labels.matches(subset));
        before - family.cells.len()
    }
}

/// Snapshot of every gauge family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Families sorted by name.
    pub families: Vec<FamilySnapshot>,
}

/// Snapshot of one gauge family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilySnapshot {
    /// Metric name.
    pub name: String,
    /// Help text (empty for undeclared families).
    pub help: String,
    /// Samples sorted by label set.
    pub samples: Vec<Sample>,
}

/// One labeled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Labels of the sample.
    pub labels: LabelSet,
    /// Gauge value.
    pub value: f64,
}
