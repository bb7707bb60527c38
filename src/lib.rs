//! Ping Collector - ICMP reachability and latency metrics
//!
//! Probes a set of network targets with ICMP echo requests and turns the
//! answers into round-trip time statistics and per-target availability.
//!
//! # Architecture
//!
//! - **Config**: JSON/YAML configuration with fail-fast validation
//! - **Collector**: Concurrent per-target probing with a bounded worker pool
//! - **Metrics**: Metric schema, point construction, and emitters
//!
//! # Example
//!
//! ```rust,no_run
//! use ping_collector::{IcmpProber, JsonLinesEmitter, PingCollector, PingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PingConfig::load("ping.json")?;
//!     let collector = PingCollector::from_config(IcmpProber::new(config.probe_timeout), &config);
//!
//!     let emitter = JsonLinesEmitter::new(std::io::stdout());
//!     let report = collector
//!         .run_cycle(&config.targets(), &config.probe_config(), &emitter)
//!         .await;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod metrics;

pub use collector::ping::IcmpProber;
pub use collector::{
    CycleReport, EmitFailure, PingCollector, ProbeConfig, ProbeError, ProbeResult, Prober,
    RttStats, TargetSpec,
};
pub use config::{ConfigError, PingConfig};
pub use metrics::{
    ChannelEmitter, EmitError, JsonLinesEmitter, METRIC_DEFINITIONS, MetricDefinition,
    MetricEmitter, MetricPoint,
};
