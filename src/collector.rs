//! Collector Layer
//!
//! Probes every configured target concurrently and converts each outcome
//! into metric points. Each target runs in its own Tokio task.
//!
//! # Architecture
//!
//! - [`Prober`]: probe primitive sending echo requests to one address
//! - [`probe_target`]: turns a primitive's samples into a [`ProbeResult`]
//! - [`PingCollector`]: fan-out/fan-in over all targets of a cycle
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ping_collector::collector::{PingCollector, ProbeConfig, TargetSpec};
//! use ping_collector::collector::ping::IcmpProber;
//!
//! # async fn run() {
//! let collector = PingCollector::new(IcmpProber::new(Duration::from_secs(1)))
//!     .with_max_concurrency(16);
//! let targets = vec![TargetSpec::new("1.1.1.1"), TargetSpec::new("example.com")];
//! let points = collector
//!     .collect(&targets, &ProbeConfig::new(3, Duration::from_secs(1)))
//!     .await;
//! # }
//! ```

mod engine;
pub mod ping;
mod target;
mod traits;

pub use engine::{CycleReport, EmitFailure, PingCollector};
pub use target::{ProbeConfig, ProbeResult, RttStats, TargetSpec, probe_target};
pub use traits::{ProbeError, Prober};
