//! Configuration module.
//!
//! Provides JSON/YAML loading and validation for the ping collector:
//! - Target addresses, probe count and probe spacing
//! - Optional tuning (reply timeout, per-target deadline, concurrency limit)

mod plugin;
mod validation;

pub use plugin::{DEFAULT_MAX_CONCURRENCY, DEFAULT_PROBE_TIMEOUT, PingConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration};
