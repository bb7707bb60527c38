//! Ping Collector Binary Entry Point
//!
//! Runs a single collection cycle and writes the metric points to stdout as
//! JSON lines. Logs go to stderr. Scheduling repeated cycles is left to
//! whatever invokes the binary.

use std::process::ExitCode;

use clap::Parser;
use ping_collector::{
    IcmpProber, JsonLinesEmitter, METRIC_DEFINITIONS, PingCollector, PingConfig,
    config::parse_duration,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ping Collector - ICMP reachability and latency metrics
#[derive(Parser, Debug)]
#[command(name = "ping-collector", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (JSON or YAML)
    #[arg(
        short,
        long,
        default_value = "configs/ping.json",
        env = "PING_COLLECTOR_CONFIG"
    )]
    config: String,

    /// Maximum targets probed at once (overrides config file)
    #[arg(long, env = "PING_COLLECTOR_MAX_CONCURRENCY")]
    max_concurrency: Option<usize>,

    /// Deadline per target, e.g. "5s" (overrides config file)
    #[arg(long, value_parser = parse_duration)]
    target_timeout: Option<std::time::Duration>,

    /// Reply timeout per echo request, e.g. "800ms" (overrides config file)
    #[arg(long, value_parser = parse_duration)]
    probe_timeout: Option<std::time::Duration>,

    /// Print the metric definitions as JSON and exit
    #[arg(long)]
    list_metrics: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ping_collector=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "Ping collector failed");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the cycle ran but some points could not be written.
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    if cli.list_metrics {
        println!("{}", serde_json::to_string_pretty(&METRIC_DEFINITIONS)?);
        return Ok(true);
    }

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = PingConfig::load(&cli.config)?;

    // CLI/env overrides (CLI > ENV > config file)
    if let Some(limit) = cli.max_concurrency {
        config.max_concurrency = limit;
    }
    if let Some(limit) = cli.target_timeout {
        config.target_timeout = Some(limit);
    }
    if let Some(timeout) = cli.probe_timeout {
        config.probe_timeout = timeout;
    }
    config.validate()?;

    for addr in config.duplicate_targets() {
        tracing::warn!(host = %addr, "Duplicate target address, it will be probed twice");
    }

    tracing::info!(
        targets = config.target_addresses.len(),
        requests = config.requests,
        interval_sec = config.interval_sec,
        max_concurrency = config.max_concurrency,
        "Starting ping collection"
    );

    let collector = PingCollector::from_config(IcmpProber::new(config.probe_timeout), &config);
    let emitter = JsonLinesEmitter::new(std::io::stdout());

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let report = collector
        .run_cycle_with_cancel(
            &config.targets(),
            &config.probe_config(),
            &emitter,
            cancel,
        )
        .await;

    for failure in &report.failures {
        tracing::error!(
            host = %failure.target,
            path = %failure.path,
            error = %failure.error,
            "Metric was not written"
        );
    }
    tracing::info!("{}", report);

    Ok(report.is_success())
}

/// Cancel the running cycle on Ctrl+C or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, cancelling cycle");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, cancelling cycle");
        }
    }

    cancel.cancel();
}
