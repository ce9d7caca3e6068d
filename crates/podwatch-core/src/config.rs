//! Podwatch configuration.
//!
//! Configuration is validated at load time with sensible defaults and clear
//! error messages. Durations are written in humantime form (`"1h"`, `"30s"`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PodwatchError, Result};
use crate::types::ObjectKey;
use crate::watcher::DEFAULT_RECHECK_INTERVAL;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodwatchConfig {
    /// Certificate subject.
    #[serde(default)]
    pub certificate: CertificateConfig,

    /// Reconcile runtime settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,

    /// Metric export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

impl PodwatchConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.certificate.validate()?;
        self.reconcile.validate()?;
        self.export.validate()?;
        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PodwatchError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PodwatchError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }
}

/// The one secret whose certificates are tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// Secret namespace.
    #[serde(default = "default_certificate_namespace")]
    pub namespace: String,

    /// Secret name.
    #[serde(default = "default_certificate_secret")]
    pub secret_name: String,

    /// Time-driven recheck interval.
    #[serde(default = "default_recheck_interval")]
    #[serde(with = "humantime_duration")]
    pub recheck_interval: Duration,
}

fn default_certificate_namespace() -> String {
    "linkerd".to_string()
}

fn default_certificate_secret() -> String {
    "linkerd-identity-issuer".to_string()
}

fn default_recheck_interval() -> Duration {
    DEFAULT_RECHECK_INTERVAL
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            namespace: default_certificate_namespace(),
            secret_name: default_certificate_secret(),
            recheck_interval: default_recheck_interval(),
        }
    }
}

impl CertificateConfig {
    /// Returns the subject key.
    #[must_use]
    pub fn subject(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.secret_name.clone())
    }

    fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(PodwatchError::config("certificate.namespace cannot be empty"));
        }
        if self.secret_name.is_empty() {
            return Err(PodwatchError::config(
                "certificate.secret_name cannot be empty",
            ));
        }
        if self.recheck_interval.is_zero() {
            return Err(PodwatchError::config(
                "certificate.recheck_interval must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Reconcile runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Deadline for a single reconcile pass.
    #[serde(default = "default_reconcile_timeout")]
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    /// Maximum number of reconciles running at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Capacity of the notification queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Retry backoff for failed reconciles.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_reconcile_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrent() -> usize {
    8
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            timeout: default_reconcile_timeout(),
            max_concurrent: default_max_concurrent(),
            queue_capacity: default_queue_capacity(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ReconcileConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(PodwatchError::config(
                "reconcile.timeout must be greater than 0",
            ));
        }
        if self.max_concurrent == 0 {
            return Err(PodwatchError::config(
                "reconcile.max_concurrent must be greater than 0",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(PodwatchError::config(
                "reconcile.queue_capacity must be greater than 0",
            ));
        }
        self.backoff.validate()
    }
}

/// Exponential backoff for retryable reconcile failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    #[serde(default = "default_initial_delay")]
    #[serde(with = "humantime_duration")]
    pub initial_delay: Duration,

    /// Upper bound on the delay.
    #[serde(default = "default_max_delay")]
    #[serde(with = "humantime_duration")]
    pub max_delay: Duration,

    /// Multiplier applied per consecutive failure.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl BackoffConfig {
    /// Sets the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the max delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the multiplier.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay before retry number `failures` (0-based).
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let base_secs = self.initial_delay.as_secs_f64();
        let exponent = i32::try_from(failures).unwrap_or(i32::MAX);
        let exp_secs = base_secs * self.multiplier.powi(exponent);
        let clamped_secs = exp_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(clamped_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.multiplier < 1.0 || !self.multiplier.is_finite() {
            return Err(PodwatchError::config(
                "reconcile.backoff.multiplier must be a finite value >= 1.0",
            ));
        }
        if self.max_delay < self.initial_delay {
            return Err(PodwatchError::config(
                "reconcile.backoff.max_delay must not be below initial_delay",
            ));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Full single-line events with targets.
    #[default]
    Full,
    /// Compact single-line events.
    Compact,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

/// Metric export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Prefix prepended to every exported metric name as `<prefix>_<name>`.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.prefix {
            let valid = prefix
                .chars()
                .enumerate()
                .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
            if prefix.is_empty() || !valid {
                return Err(PodwatchError::config(format!(
                    "export.prefix {prefix:?} is not a valid metric name prefix"
                )));
            }
        }
        Ok(())
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
