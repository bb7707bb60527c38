//! Metric Layer
//!
//! Turns probe outcomes into metric points and hands them to a sink.
//!
//! # Components
//!
//! - [`MetricPoint`]: path, integer value and `target` tag
//! - [`METRIC_DEFINITIONS`]: the four declared metric paths with units
//! - [`MetricEmitter`]: sink trait, with [`ChannelEmitter`] and
//!   [`JsonLinesEmitter`] implementations
//! - [`EmitError`]: failures reported by emitters

mod emitter;
mod error;
mod types;

pub use emitter::{ChannelEmitter, JsonLinesEmitter, MetricEmitter};
pub use error::EmitError;
pub use types::{
    AVAILABILITY_PATH, AVG_TIME_PATH, MAX_TIME_PATH, METRIC_DEFINITIONS, MIN_TIME_PATH,
    MetricDefinition, MetricPoint, TARGET_TAG, build_points, to_ms,
};
