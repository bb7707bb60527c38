//! Metric points and the metric schema.
//!
//! - [`MetricPoint`]: one emitted value with its `target` tag
//! - [`MetricDefinition`] / [`METRIC_DEFINITIONS`]: declared metric paths
//! - [`build_points`]: maps one probe outcome onto its metric points

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collector::{ProbeResult, TargetSpec};

/// Average round-trip time, milliseconds.
pub const AVG_TIME_PATH: &str = "/ping/avg_time";
/// Minimum round-trip time, milliseconds.
pub const MIN_TIME_PATH: &str = "/ping/min_time";
/// Maximum round-trip time, milliseconds.
pub const MAX_TIME_PATH: &str = "/ping/max_time";
/// Availability, 0 or 1.
pub const AVAILABILITY_PATH: &str = "/ping/availability";

/// Tag key carrying the probed address.
pub const TARGET_TAG: &str = "target";

/// Declaration of one metric path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricDefinition {
    pub path: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
}

/// Every metric the collector can emit, in per-target emission order.
pub const METRIC_DEFINITIONS: [MetricDefinition; 4] = [
    MetricDefinition {
        path: AVG_TIME_PATH,
        unit: "ms",
        description: "Average duration of ping requests",
    },
    MetricDefinition {
        path: MIN_TIME_PATH,
        unit: "ms",
        description: "Minimum duration of ping requests",
    },
    MetricDefinition {
        path: MAX_TIME_PATH,
        unit: "ms",
        description: "Maximum duration of ping requests",
    },
    MetricDefinition {
        path: AVAILABILITY_PATH,
        unit: "",
        description: "Target address is available via ping [0-no, 1-yes]",
    },
];

/// A single metric value produced by a collection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Metric path (e.g., "/ping/avg_time").
    pub path: String,
    /// Numeric value; whole milliseconds for time metrics.
    pub value: i64,
    /// Tag set, always containing `target`.
    pub tags: BTreeMap<String, String>,
    /// Time the point was built (UTC).
    pub ts: DateTime<Utc>,
}

impl MetricPoint {
    /// Create a point tagged with `target`.
    pub fn new(path: impl Into<String>, value: i64, target: &TargetSpec) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TARGET_TAG.to_string(), target.address().to_string());
        Self {
            path: path.into(),
            value,
            tags,
            ts: Utc::now(),
        }
    }

    /// Address from the `target` tag.
    pub fn target(&self) -> Option<&str> {
        self.tags.get(TARGET_TAG).map(String::as_str)
    }
}

/// Convert a duration to whole milliseconds, truncating toward zero.
///
/// ```
/// use std::time::Duration;
/// use ping_collector::metrics::to_ms;
///
/// assert_eq!(to_ms(Duration::from_nanos(2_500_000)), 2);
/// ```
pub fn to_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Build the metric points for one target's outcome.
///
/// Reachable targets yield avg, min, max and `availability = 1`, in that
/// order. Unreachable targets yield only `availability = 0`.
pub fn build_points(target: &TargetSpec, result: &ProbeResult) -> Vec<MetricPoint> {
    match result {
        ProbeResult::Reachable(stats) => vec![
            MetricPoint::new(AVG_TIME_PATH, to_ms(stats.avg), target),
            MetricPoint::new(MIN_TIME_PATH, to_ms(stats.min), target),
            MetricPoint::new(MAX_TIME_PATH, to_ms(stats.max), target),
            MetricPoint::new(AVAILABILITY_PATH, 1, target),
        ],
        ProbeResult::Unreachable => vec![MetricPoint::new(AVAILABILITY_PATH, 0, target)],
    }
}
