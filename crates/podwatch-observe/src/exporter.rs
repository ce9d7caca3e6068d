//! Prometheus text exposition of the gauge registry.
//!
//! A registry snapshot is materialised into `prometheus` metric families and
//! written by [`TextEncoder`]. Families come out in name order, samples in
//! label order, so two renders of the same registry state are byte-identical.
//! Families without samples are left out.

use podwatch_core::{ExportConfig, FamilySnapshot, GaugeRegistry, RegistrySnapshot, Sample};
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};

use crate::error::{ObserveError, Result};

/// Renders a [`GaugeRegistry`] in Prometheus text format.
#[derive(Debug, Clone)]
pub struct PrometheusExporter {
    registry: GaugeRegistry,
    prefix: Option<String>,
}

impl PrometheusExporter {
    /// Creates an exporter for `registry`.
    #[must_use]
    pub fn new(registry: GaugeRegistry, config: &ExportConfig) -> Self {
        Self {
            registry,
            prefix: config.prefix.clone(),
        }
    }

    /// Returns the exported name of `metric`.
    #[must_use]
    pub fn metric_name(&self, metric: &str) -> String {
        prefixed(self.prefix.as_deref(), metric)
    }

    /// Renders the current registry state.
    ///
    /// # Errors
    /// Returns an error if the encoder rejects a family.
    pub fn export(&self) -> Result<String> {
        render(&self.registry.snapshot(), self.prefix.as_deref())
    }
}

/// Renders a registry snapshot.
///
/// # Errors
/// Returns an error if the encoder rejects a family.
pub fn render(snapshot: &RegistrySnapshot, prefix: Option<&str>) -> Result<String> {
    let families: Vec<MetricFamily> = snapshot
        .families
        .iter()
        .filter(|family| !family.samples.is_empty())
        .map(|family| metric_family(family, prefix))
        .collect();

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buffer)
        .map_err(|e| ObserveError::export(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ObserveError::export(e.to_string()))
}

fn prefixed(prefix: Option<&str>, metric: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}_{metric}"),
        None => metric.to_string(),
    }
}

fn metric_family(family: &FamilySnapshot, prefix: Option<&str>) -> MetricFamily {
    let mut proto = MetricFamily::default();
    proto.set_name(prefixed(prefix, &family.name));
    proto.set_help(family.help.clone());
    proto.set_field_type(MetricType::GAUGE);
    for sample in &family.samples {
        proto.mut_metric().push(gauge_sample(sample));
    }
    proto
}

fn gauge_sample(sample: &Sample) -> Metric {
    let mut metric = Metric::default();
    for (name, value) in sample.labels.iter() {
        let mut pair = LabelPair::default();
        pair.set_name(name.to_string());
        pair.set_value(value.to_string());
        metric.mut_label().push(pair);
    }
    let mut gauge = Gauge::default();
    gauge.set_value(sample.value);
    metric.set_gauge(gauge);
    metric
}
