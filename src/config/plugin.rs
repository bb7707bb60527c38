//! Collector configuration as delivered by the host.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collector::{ProbeConfig, TargetSpec};

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default per-echo reply timeout (1 second).
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of targets probed at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

fn default_probe_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

// =============================================================================
// Ping Configuration
// =============================================================================

/// Ping collector configuration.
///
/// The first three fields form the wire format the host hands over:
///
/// ```json
/// { "target_addresses": ["8.8.8.8", "example.com"], "requests": 3, "interval_sec": 1 }
/// ```
///
/// The remaining fields are optional tuning knobs with defaults, so a plain
/// three-field document loads unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingConfig {
    /// Hostnames or IP addresses to probe.
    #[serde(default)]
    pub target_addresses: Vec<String>,

    /// Echo requests sent to each target per cycle.
    #[serde(default)]
    pub requests: u32,

    /// Seconds between consecutive echo requests to the same target.
    #[serde(default)]
    pub interval_sec: u64,

    /// Reply timeout for a single echo request (default: 1s).
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// Deadline for one target's whole probe sequence (default: none).
    #[serde(default, with = "humantime_serde")]
    pub target_timeout: Option<Duration>,

    /// Maximum number of targets probed concurrently (default: 64).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl PingConfig {
    /// Create a configuration with default tuning values.
    pub fn new<I, S>(targets: I, requests: u32, interval_sec: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_addresses: targets.into_iter().map(Into::into).collect(),
            requests,
            interval_sec,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            target_timeout: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Set the per-echo reply timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the per-target deadline.
    pub fn with_target_timeout(mut self, timeout: Duration) -> Self {
        self.target_timeout = Some(timeout);
        self
    }

    /// Set the concurrency limit.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Parse and validate a raw JSON payload.
    ///
    /// # Errors
    /// Returns `ConfigError::Json` for malformed payloads and
    /// `ConfigError::Validation` for out-of-range values.
    pub fn from_slice(raw: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON or YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing.
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
    /// as JSON.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = expand_env_vars(&std::fs::read_to_string(path)?);

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: Self = if ext == "yaml" || ext == "yml" {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            targets = config.target_addresses.len(),
            requests = config.requests,
            interval_sec = config.interval_sec,
            "Loaded ping configuration"
        );
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requests == 0 {
            return Err(ConfigError::Validation(
                "requests must be positive".to_string(),
            ));
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "max_concurrency must be positive".to_string(),
            ));
        }

        if self.probe_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "probe_timeout must be non-zero".to_string(),
            ));
        }

        if self.target_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Validation(
                "target_timeout must be non-zero".to_string(),
            ));
        }

        if let Some(pos) = self
            .target_addresses
            .iter()
            .position(|addr| addr.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "target_addresses[{}] cannot be empty",
                pos
            )));
        }

        Ok(())
    }

    /// Addresses listed more than once, compared after trimming.
    ///
    /// Each repeat is reported once per extra occurrence, in list order.
    pub fn duplicate_targets(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.target_addresses
            .iter()
            .map(|addr| addr.trim())
            .filter(|addr| !seen.insert(*addr))
            .collect()
    }

    /// Targets for one collection cycle.
    pub fn targets(&self) -> Vec<TargetSpec> {
        self.target_addresses
            .iter()
            .map(|addr| TargetSpec::new(addr.trim()))
            .collect()
    }

    /// Probe parameters shared by every target in a cycle.
    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::new(self.requests, Duration::from_secs(self.interval_sec))
    }
}
