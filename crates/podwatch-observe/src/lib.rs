// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # podwatch-observe
//!
//! Observability integration for podwatch.
//!
//! This crate provides:
//! - **Metrics export**: Prometheus text exposition of the gauge registry
//! - **Logging**: `tracing` subscriber setup driven by [`LogConfig`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use podwatch_core::{GaugeRegistry, PodwatchConfig};
//! use podwatch_observe::{PrometheusExporter, logging};
//!
//! let config = PodwatchConfig::load("podwatch.toml")?;
//! logging::init(&config.logging)?;
//!
//! let exporter = PrometheusExporter::new(GaugeRegistry::new(), &config.export);
//! println!("{}", exporter.export()?);
//! ```
//!
//! [`LogConfig`]: podwatch_core::LogConfig

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod exporter;
pub mod logging;

pub use error::{ObserveError, Result};
pub use exporter::{PrometheusExporter, render};
