//! Collection Cycle Integration Tests
//!
//! Drives `PingCollector` end to end with scripted probers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ping_collector::metrics::{
    AVAILABILITY_PATH, AVG_TIME_PATH, MAX_TIME_PATH, MIN_TIME_PATH,
};
use ping_collector::{
    ChannelEmitter, EmitError, MetricEmitter, MetricPoint, PingCollector, ProbeConfig, ProbeError,
    Prober, TargetSpec,
};
use rand::Rng;

// =============================================================================
// Test Helpers
// =============================================================================

/// Scripted outcome for one address.
#[derive(Clone)]
enum Script {
    Reply(Vec<Duration>),
    Fail,
    Panic,
}

/// Prober answering from a per-address script and counting calls.
struct ScriptedProber {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
}

impl ScriptedProber {
    fn new(scripts: impl IntoIterator<Item = (&'static str, Script)>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(addr, script)| (addr.to_string(), script))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn send(
        &self,
        address: &str,
        count: u32,
        _interval: Duration,
    ) -> Result<Vec<Duration>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(address) {
            Some(Script::Reply(samples)) => Ok(samples.clone()),
            Some(Script::Panic) => panic!("scripted prober panic for {address}"),
            Some(Script::Fail) | None => Err(ProbeError::NoReply {
                host: address.to_string(),
                count,
            }),
        }
    }
}

/// Prober sleeping a random time per call and answering with that time.
struct JitterProber {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Prober for JitterProber {
    async fn send(
        &self,
        address: &str,
        count: u32,
        _interval: Duration,
    ) -> Result<Vec<Duration>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay_ms, fail) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(0..15u64), rng.gen_bool(0.2))
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        if fail {
            return Err(ProbeError::NoReply {
                host: address.to_string(),
                count,
            });
        }
        Ok((0..count)
            .map(|i| Duration::from_millis(delay_ms + u64::from(i)))
            .collect())
    }
}

/// Emitter rejecting every point of one target.
struct RejectingEmitter {
    reject: &'static str,
    inner: ChannelEmitter,
}

impl MetricEmitter for RejectingEmitter {
    fn emit(&self, point: &MetricPoint) -> Result<(), EmitError> {
        if point.target() == Some(self.reject) {
            return Err(EmitError::ChannelClosed);
        }
        self.inner.emit(point)
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn cfg(count: u32) -> ProbeConfig {
    ProbeConfig::new(count, Duration::ZERO)
}

/// Index points as target -> path -> value.
fn by_target(points: &[MetricPoint]) -> BTreeMap<String, BTreeMap<String, i64>> {
    let mut index: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for point in points {
        let target = point.target().expect("point without target tag").to_string();
        let previous = index
            .entry(target)
            .or_default()
            .insert(point.path.clone(), point.value);
        assert!(previous.is_none(), "duplicate point {}", point.path);
    }
    index
}

// =============================================================================
// Cycle Semantics
// =============================================================================

#[tokio::test]
async fn test_failing_target_is_isolated() {
    let prober = ScriptedProber::new([
        ("A", Script::Fail),
        ("B", Script::Reply(vec![ms(10), ms(12), ms(11)])),
    ]);
    let collector = PingCollector::new(prober);
    let targets = vec![TargetSpec::new("A"), TargetSpec::new("B")];

    let points = collector.collect(&targets, &cfg(3)).await;
    let index = by_target(&points);

    assert_eq!(points.len(), 5);
    assert_eq!(
        index["A"],
        BTreeMap::from([(AVAILABILITY_PATH.to_string(), 0)])
    );
    assert_eq!(
        index["B"],
        BTreeMap::from([
            (AVG_TIME_PATH.to_string(), 11),
            (MIN_TIME_PATH.to_string(), 10),
            (MAX_TIME_PATH.to_string(), 12),
            (AVAILABILITY_PATH.to_string(), 1),
        ])
    );
}

#[tokio::test]
async fn test_per_target_point_order() {
    let prober = ScriptedProber::new([
        ("10.0.0.1", Script::Reply(vec![ms(3), ms(9)])),
        ("10.0.0.2", Script::Fail),
        ("10.0.0.3", Script::Reply(vec![ms(1)])),
    ]);
    let collector = PingCollector::new(prober);
    let targets: Vec<_> = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        .into_iter()
        .map(TargetSpec::new)
        .collect();

    let points = collector.collect(&targets, &cfg(2)).await;

    // Points of each target are contiguous and in fixed order.
    let mut i = 0;
    while i < points.len() {
        let target = points[i].target().unwrap();
        if points[i].path == AVAILABILITY_PATH {
            assert_eq!(points[i].value, 0, "{target}");
            i += 1;
            continue;
        }
        let paths: Vec<_> = points[i..i + 4].iter().map(|p| p.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![AVG_TIME_PATH, MIN_TIME_PATH, MAX_TIME_PATH, AVAILABILITY_PATH]
        );
        assert!(points[i..i + 4].iter().all(|p| p.target() == Some(target)));
        i += 4;
    }
}

#[tokio::test]
async fn test_millisecond_truncation() {
    let prober = ScriptedProber::new([("host", Script::Reply(vec![Duration::from_nanos(2_500_000)]))]);
    let collector = PingCollector::new(prober);

    let points = collector.collect(&[TargetSpec::new("host")], &cfg(1)).await;
    let index = by_target(&points);

    assert_eq!(index["host"][AVG_TIME_PATH], 2);
    assert_eq!(index["host"][MIN_TIME_PATH], 2);
    assert_eq!(index["host"][MAX_TIME_PATH], 2);
}

#[tokio::test]
async fn test_repeated_cycles_are_independent() {
    let prober = ScriptedProber::new([
        ("up", Script::Reply(vec![ms(20), ms(40), ms(30)])),
        ("down", Script::Fail),
    ]);
    let collector = PingCollector::new(prober);
    let targets = vec![TargetSpec::new("up"), TargetSpec::new("down")];

    let first = by_target(&collector.collect(&targets, &cfg(3)).await);
    let second = by_target(&collector.collect(&targets, &cfg(3)).await);

    assert_eq!(first, second);
    assert_eq!(first["up"][AVG_TIME_PATH], 30);
}

#[tokio::test]
async fn test_panicking_unit_still_reports() {
    let prober = ScriptedProber::new([
        ("boom", Script::Panic),
        ("fine", Script::Reply(vec![ms(5)])),
    ]);
    let collector = PingCollector::new(prober);
    let targets = vec![TargetSpec::new("boom"), TargetSpec::new("fine")];

    let points = collector.collect(&targets, &cfg(1)).await;
    let index = by_target(&points);

    assert_eq!(
        index["boom"],
        BTreeMap::from([(AVAILABILITY_PATH.to_string(), 0)])
    );
    assert_eq!(index["fine"][AVAILABILITY_PATH], 1);
}

#[tokio::test]
async fn test_reachable_stats_invariant() {
    let prober = ScriptedProber::new([
        ("a", Script::Reply(vec![ms(7), ms(2), ms(90), ms(15)])),
        ("b", Script::Reply(vec![ms(0)])),
        ("c", Script::Reply(vec![Duration::from_micros(999), ms(1)])),
    ]);
    let collector = PingCollector::new(prober);
    let targets: Vec<_> = ["a", "b", "c"].into_iter().map(TargetSpec::new).collect();

    let index = by_target(&collector.collect(&targets, &cfg(4)).await);

    for (target, values) in &index {
        let (avg, min, max) = (
            values[AVG_TIME_PATH],
            values[MIN_TIME_PATH],
            values[MAX_TIME_PATH],
        );
        assert!(min >= 0, "{target}");
        assert!(min <= avg && avg <= max, "{target}: {min} {avg} {max}");
    }
}

// =============================================================================
// Emission
// =============================================================================

#[tokio::test]
async fn test_emit_failure_does_not_stop_other_targets() {
    let prober = ScriptedProber::new([
        ("bad", Script::Reply(vec![ms(4)])),
        ("good", Script::Reply(vec![ms(6)])),
        ("gone", Script::Fail),
    ]);
    let collector = PingCollector::new(prober);
    let (inner, rx) = ChannelEmitter::channel(64);
    let emitter = RejectingEmitter {
        reject: "bad",
        inner,
    };
    let targets: Vec<_> = ["bad", "good", "gone"].into_iter().map(TargetSpec::new).collect();

    let report = collector.run_cycle(&targets, &cfg(1), &emitter).await;

    assert_eq!(report.targets, 3);
    assert_eq!(report.reachable, 2);
    assert_eq!(report.unreachable, 1);
    assert_eq!(report.emitted, 5);
    assert_eq!(report.failures.len(), 4);
    assert!(report.failures.iter().all(|f| f.target == "bad"));

    let delivered: Vec<_> = rx.try_iter().collect();
    let index = by_target(&delivered);
    assert_eq!(index["good"].len(), 4);
    assert_eq!(index["gone"][AVAILABILITY_PATH], 0);
    assert!(!index.contains_key("bad"));
}

#[tokio::test]
async fn test_run_cycle_shared_emitter() {
    let prober = ScriptedProber::new([("x", Script::Reply(vec![ms(1)]))]);
    let collector = PingCollector::new(prober);
    let (emitter, rx) = ChannelEmitter::channel(16);
    let emitter: Arc<dyn MetricEmitter> = Arc::new(emitter);

    let report = collector
        .run_cycle(&[TargetSpec::new("x")], &cfg(1), emitter.as_ref())
        .await;

    assert!(report.is_success());
    assert_eq!(rx.try_iter().count(), 4);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_targets_random_latency() {
    for round in 0..5 {
        let prober = Arc::new(JitterProber {
            calls: AtomicUsize::new(0),
        });
        let collector = PingCollector::new(Arc::clone(&prober)).with_max_concurrency(16);
        let targets: Vec<_> = (0..100)
            .map(|i| TargetSpec::new(format!("host-{i}")))
            .collect();
        let (emitter, rx) = ChannelEmitter::channel(1000);

        let report = collector.run_cycle(&targets, &cfg(3), &emitter).await;

        assert_eq!(prober.calls.load(Ordering::SeqCst), 100, "round {round}");
        assert_eq!(report.targets, 100);
        assert_eq!(report.reachable + report.unreachable, 100);
        assert!(report.is_success());

        let points: Vec<_> = rx.try_iter().collect();
        assert_eq!(points.len(), report.reachable * 4 + report.unreachable);

        let index = by_target(&points);
        assert_eq!(index.len(), 100);
        for values in index.values() {
            match values.len() {
                4 => assert_eq!(values[AVAILABILITY_PATH], 1),
                1 => assert_eq!(values[AVAILABILITY_PATH], 0),
                n => panic!("unexpected point count {n}"),
            }
        }
    }
}

#[tokio::test]
async fn test_slow_target_does_not_block_results() {
    struct OneSlow;

    #[async_trait::async_trait]
    impl Prober for OneSlow {
        async fn send(
            &self,
            address: &str,
            _count: u32,
            _interval: Duration,
        ) -> Result<Vec<Duration>, ProbeError> {
            if address == "slow" {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(vec![ms(1)])
        }
    }

    let collector = PingCollector::new(OneSlow);
    let targets: Vec<_> = ["slow", "f1", "f2", "f3"].into_iter().map(TargetSpec::new).collect();

    let points = collector.collect(&targets, &cfg(1)).await;

    // Completion order: the slow target finishes last but is still included.
    assert_eq!(points.len(), 16);
    assert_eq!(points.last().unwrap().target(), Some("slow"));
}
