//! Concurrent collection engine.
//!
//! One tokio task per target, a semaphore capping how many probe sequences
//! run at once, and a `JoinSet` fan-in that accounts for every task.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::{DEFAULT_MAX_CONCURRENCY, PingConfig};
use crate::metrics::{EmitError, MetricEmitter, MetricPoint, build_points};

use super::target::{ProbeConfig, ProbeResult, TargetSpec, probe_target};
use super::traits::Prober;

/// A metric point the emitter refused.
#[derive(Debug)]
pub struct EmitFailure {
    /// Probed address the point belonged to.
    pub target: String,
    /// Metric path of the refused point.
    pub path: String,
    pub error: EmitError,
}

/// Summary of one collection cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Targets probed (one unit of work each).
    pub targets: usize,
    pub reachable: usize,
    pub unreachable: usize,
    /// Points accepted by the emitter.
    pub emitted: usize,
    /// Points the emitter refused; the cycle continued past each of them.
    pub failures: Vec<EmitFailure>,
    /// Wall-clock time of the cycle.
    pub elapsed: Duration,
}

impl CycleReport {
    /// True when every point was accepted by the emitter.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} target(s): {} reachable, {} unreachable, {} point(s) emitted, {} failed in {}ms",
            self.targets,
            self.reachable,
            self.unreachable,
            self.emitted,
            self.failures.len(),
            self.elapsed.as_millis()
        )
    }
}

/// Concurrent ping collector.
///
/// Each call to [`collect`](Self::collect) or [`run_cycle`](Self::run_cycle)
/// is an independent cycle: every target gets its own task, a slow or dead
/// target never holds back the results of the others, and the call returns
/// only after every task has finished. Nothing is carried between cycles.
///
/// # Example
///
/// ```rust,no_run
/// use ping_collector::{ChannelEmitter, IcmpProber, PingCollector, PingConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PingConfig::from_slice(br#"{"target_addresses": ["1.1.1.1"], "requests": 3, "interval_sec": 1}"#)?;
/// let collector = PingCollector::from_config(IcmpProber::new(config.probe_timeout), &config);
///
/// let (emitter, rx) = ChannelEmitter::channel(1024);
/// let report = collector
///     .run_cycle(&config.targets(), &config.probe_config(), &emitter)
///     .await;
/// assert!(report.is_success());
/// for point in rx.try_iter() {
///     println!("{} {} {:?}", point.path, point.value, point.tags);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PingCollector<P> {
    prober: Arc<P>,
    max_concurrency: usize,
    target_timeout: Option<Duration>,
}

impl<P> fmt::Debug for PingCollector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PingCollector")
            .field("max_concurrency", &self.max_concurrency)
            .field("target_timeout", &self.target_timeout)
            .finish_non_exhaustive()
    }
}

impl<P: Prober> PingCollector<P> {
    /// Create a collector with the default concurrency limit and no
    /// per-target deadline.
    pub fn new(prober: P) -> Self {
        Self {
            prober: Arc::new(prober),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            target_timeout: None,
        }
    }

    /// Create a collector using the tuning values of `config`.
    pub fn from_config(prober: P, config: &PingConfig) -> Self {
        let collector = Self::new(prober).with_max_concurrency(config.max_concurrency);
        match config.target_timeout {
            Some(limit) => collector.with_target_timeout(limit),
            None => collector,
        }
    }

    /// Cap the number of targets probed at the same time (minimum 1).
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    /// Abandon a target's remaining probes after `limit`.
    pub fn with_target_timeout(mut self, limit: Duration) -> Self {
        self.target_timeout = Some(limit);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn target_timeout(&self) -> Option<Duration> {
        self.target_timeout
    }

    /// Probe every target and return the resulting metric points.
    ///
    /// Points of one target are contiguous and ordered avg, min, max,
    /// availability; targets appear in completion order.
    pub async fn collect(&self, targets: &[TargetSpec], cfg: &ProbeConfig) -> Vec<MetricPoint> {
        self.collect_with_cancel(targets, cfg, CancellationToken::new())
            .await
    }

    /// Like [`collect`](Self::collect), but targets still pending when
    /// `cancel` fires are reported unreachable.
    pub async fn collect_with_cancel(
        &self,
        targets: &[TargetSpec],
        cfg: &ProbeConfig,
        cancel: CancellationToken,
    ) -> Vec<MetricPoint> {
        let mut points = Vec::with_capacity(targets.len() * 4);
        self.fan_out(targets, cfg, &cancel, |target, result| {
            points.extend(build_points(&target, &result));
        })
        .await;
        points
    }

    /// Probe every target and hand each point to `emitter` as soon as its
    /// target completes.
    ///
    /// A refused point is recorded in the report and the cycle carries on
    /// with the remaining points and targets.
    pub async fn run_cycle<E>(
        &self,
        targets: &[TargetSpec],
        cfg: &ProbeConfig,
        emitter: &E,
    ) -> CycleReport
    where
        E: MetricEmitter + ?Sized,
    {
        self.run_cycle_with_cancel(targets, cfg, emitter, CancellationToken::new())
            .await
    }

    /// Like [`run_cycle`](Self::run_cycle), with external cancellation.
    pub async fn run_cycle_with_cancel<E>(
        &self,
        targets: &[TargetSpec],
        cfg: &ProbeConfig,
        emitter: &E,
        cancel: CancellationToken,
    ) -> CycleReport
    where
        E: MetricEmitter + ?Sized,
    {
        let start = Instant::now();
        let mut report = CycleReport {
            targets: targets.len(),
            ..CycleReport::default()
        };

        self.fan_out(targets, cfg, &cancel, |target, result| {
            if result.is_reachable() {
                report.reachable += 1;
            } else {
                report.unreachable += 1;
            }

            for point in build_points(&target, &result) {
                match emitter.emit(&point) {
                    Ok(()) => report.emitted += 1,
                    Err(error) => {
                        tracing::warn!(
                            host = %target,
                            path = %point.path,
                            error = %error,
                            "Failed to emit metric"
                        );
                        report.failures.push(EmitFailure {
                            target: target.address().to_string(),
                            path: point.path,
                            error,
                        });
                    }
                }
            }
        })
        .await;

        report.elapsed = start.elapsed();
        tracing::info!(
            targets = report.targets,
            reachable = report.reachable,
            unreachable = report.unreachable,
            emitted = report.emitted,
            failed = report.failures.len(),
            duration_ms = report.elapsed.as_millis(),
            "Collection cycle complete"
        );
        report
    }

    /// Spawn one task per target and feed each outcome to `on_result` in
    /// completion order. Returns after every task has been joined.
    async fn fan_out<F>(
        &self,
        targets: &[TargetSpec],
        cfg: &ProbeConfig,
        cancel: &CancellationToken,
        mut on_result: F,
    ) where
        F: FnMut(TargetSpec, ProbeResult),
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<Id, TargetSpec> = HashMap::with_capacity(targets.len());

        tracing::debug!(
            targets = targets.len(),
            count = cfg.count,
            interval_ms = cfg.interval.as_millis(),
            max_concurrency = self.max_concurrency,
            "Starting collection cycle"
        );

        for target in targets {
            let unit = ProbeUnit {
                prober: Arc::clone(&self.prober),
                semaphore: Arc::clone(&semaphore),
                cancel: cancel.clone(),
                target: target.clone(),
                cfg: *cfg,
                deadline: self.target_timeout,
            };
            let handle = tasks.spawn(unit.run());
            pending.insert(handle.id(), target.clone());
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    if let Some(target) = pending.remove(&id) {
                        on_result(target, result);
                    }
                }
                Err(e) => {
                    // A panicking unit still owes its target one outcome.
                    if let Some(target) = pending.remove(&e.id()) {
                        tracing::warn!(host = %target, error = %e, "Probe task failed");
                        on_result(target, ProbeResult::Unreachable);
                    }
                }
            }
        }
    }
}

/// Everything one spawned task needs to probe its target.
struct ProbeUnit<P> {
    prober: Arc<P>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    target: TargetSpec,
    cfg: ProbeConfig,
    deadline: Option<Duration>,
}

impl<P: Prober> ProbeUnit<P> {
    async fn run(self) -> ProbeResult {
        let probe = async {
            let Ok(_permit) = self.semaphore.acquire().await else {
                return ProbeResult::Unreachable;
            };

            let sequence = probe_target(self.prober.as_ref(), &self.target, &self.cfg);
            match self.deadline {
                Some(limit) => match timeout(limit, sequence).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            host = %self.target,
                            timeout_ms = limit.as_millis(),
                            "Ping probe timed out"
                        );
                        ProbeResult::Unreachable
                    }
                },
                None => sequence.await,
            }
        };

        tokio::select! {
            result = probe => result,
            _ = self.cancel.cancelled() => {
                tracing::warn!(host = %self.target, "Ping probe cancelled");
                ProbeResult::Unreachable
            }
        }
    }
}
