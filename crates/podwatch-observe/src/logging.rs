//! Tracing subscriber setup.
//!
//! `RUST_LOG`, when set, takes precedence over the configured filter.

use podwatch_core::{LogConfig, LogFormat};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::{ObserveError, Result};

/// Installs the global tracing subscriber.
///
/// # Errors
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = resolve_filter(std::env::var("RUST_LOG").ok().as_deref(), &config.filter)?;
    let directive = filter.to_string();
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| ObserveError::logging(e.to_string()))?;
    debug!(filter = %directive, format = ?config.format, "logging initialized");
    Ok(())
}

/// Builds the effective filter from an optional override and the configured
/// directive.
///
/// # Errors
/// Returns an error if the chosen directive does not parse.
pub fn resolve_filter(env_override: Option<&str>, configured: &str) -> Result<EnvFilter> {
    let directive = env_override
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(configured);
    EnvFilter::try_new(directive)
        .map_err(|e| ObserveError::logging(format!("invalid filter {directive:?}: {e}")))
}
