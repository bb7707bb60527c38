//! Ping configuration errors and value helpers.
//!
//! `parse_duration` backs the `--target-timeout` and `--probe-timeout` flags.
//! `expand_env_vars` runs over a config file's text before it is parsed, so a
//! deployment can keep target addresses in the environment.

use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use thiserror::Error;

/// Configuration error types.
///
/// Every variant is a load-time failure: no collection cycle runs with a
/// configuration that produced one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON configuration.
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    Validation(String),
}

/// Parse a human-readable timeout such as `800ms`, `5s` or `1m30s`.
///
/// A bare number is rejected: the unit is never implied.
///
/// # Examples
///
/// ```
/// use ping_collector::config::parse_duration;
///
/// assert_eq!(parse_duration("5s").unwrap().as_secs(), 5);
/// assert_eq!(parse_duration("250ms").unwrap().as_millis(), 250);
/// ```
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    match value.trim() {
        "" => Err("timeout is empty".to_string()),
        value => humantime::parse_duration(value)
            .map_err(|e| format!("invalid timeout {value:?}: {e}")),
    }
}

/// `${NAME}` or `${NAME:-fallback}` inside a config file.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("placeholder pattern is valid")
});

/// Substitute `${NAME}` / `${NAME:-fallback}` placeholders in raw config text.
///
/// An unset variable without a fallback becomes the empty string, which the
/// address check in [`PingConfig::validate`](super::PingConfig::validate)
/// then rejects.
pub fn expand_env_vars(raw: &str) -> String {
    PLACEHOLDER
        .replace_all(raw, |caps: &Captures| {
            std::env::var(&caps[1])
                .unwrap_or_else(|_| caps.get(2).map_or("", |m| m.as_str()).to_string())
        })
        .into_owned()
}
