//! Per-target probing and round-trip statistics.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::traits::Prober;

/// A single probe target: hostname or IP address, unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSpec {
    address: String,
}

impl TargetSpec {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl From<&str> for TargetSpec {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for TargetSpec {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

/// Probe parameters shared by all targets of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Number of echo requests per target.
    pub count: u32,
    /// Minimum gap between consecutive requests to one target.
    pub interval: Duration,
}

impl ProbeConfig {
    pub fn new(count: u32, interval: Duration) -> Self {
        Self { count, interval }
    }
}

/// Round-trip time summary over the answered probes of one target.
///
/// Invariant: `min <= avg <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttStats {
    pub avg: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Number of answered probes the summary was computed from.
    pub samples: usize,
}

impl RttStats {
    /// Summarize a sample set. Returns `None` when `samples` is empty.
    ///
    /// The average is the truncated arithmetic mean, so it never leaves the
    /// `[min, max]` range.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        let min = samples.iter().min().copied()?;
        let max = samples.iter().max().copied()?;
        let total: u128 = samples.iter().map(Duration::as_nanos).sum();
        let avg_nanos = total / samples.len() as u128;
        let avg = Duration::from_nanos(u64::try_from(avg_nanos).unwrap_or(u64::MAX));

        Some(Self {
            avg,
            min,
            max,
            samples: samples.len(),
        })
    }

    /// Summary for a primitive that reports one aggregate value.
    pub fn single(rtt: Duration) -> Self {
        Self {
            avg: rtt,
            min: rtt,
            max: rtt,
            samples: 1,
        }
    }
}

/// Outcome of probing one target during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// At least one probe was answered.
    Reachable(RttStats),
    /// No probe was answered, or the probe could not be sent at all.
    Unreachable,
}

impl ProbeResult {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable(_))
    }

    pub fn stats(&self) -> Option<&RttStats> {
        match self {
            Self::Reachable(stats) => Some(stats),
            Self::Unreachable => None,
        }
    }
}

/// Probe one target and classify the outcome.
///
/// Every primitive failure (resolution, socket, timeout, no reply) becomes
/// [`ProbeResult::Unreachable`]; nothing is retried.
pub async fn probe_target<P>(prober: &P, target: &TargetSpec, cfg: &ProbeConfig) -> ProbeResult
where
    P: Prober + ?Sized,
{
    match prober.send(target.address(), cfg.count, cfg.interval).await {
        Ok(samples) => match RttStats::from_samples(&samples) {
            Some(stats) => {
                tracing::debug!(
                    host = %target,
                    answered = stats.samples,
                    sent = cfg.count,
                    avg_ms = stats.avg.as_secs_f64() * 1000.0,
                    "Ping probe successful"
                );
                ProbeResult::Reachable(stats)
            }
            None => {
                tracing::warn!(host = %target, "Prober returned no samples");
                ProbeResult::Unreachable
            }
        },
        Err(e) => {
            tracing::warn!(host = %target, error = %e, "Ping probe failed");
            ProbeResult::Unreachable
        }
    }
}
