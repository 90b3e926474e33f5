//! The scheduler under paused tokio time: cadence, stimulus preemption,
//! coalescing, autosave and degraded durability.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use activation_graph_core::config::SchedulerConfig;
use activation_graph_core::engine::{Engine, NodeRequest, TickReport};
use activation_graph_core::error::{EngineError, PersistenceError};
use activation_graph_core::persistence::{
    DurabilityStatus, GraphSnapshot, MemorySnapshotStore, SnapshotStore,
};
use activation_graph_core::scheduler::{EngineHandle, Scheduler};
use activation_graph_core::stimulus::Stimulus;
use activation_graph_core::types::{EntityId, NodeId};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::common::quiet_config;

/// Timers fire on whole milliseconds.
const TIMER_SLACK: Duration = Duration::from_millis(1);

fn engine_with(keys: &[&str]) -> Engine {
    let mut engine = Engine::new(quiet_config()).expect("engine");
    for key in keys {
        engine.create_node(NodeRequest::new(*key)).expect("node");
    }
    engine
}

/// Wait for the first report with a tick after `after`.
async fn next_report(reports: &mut watch::Receiver<Option<TickReport>>, after: u64) -> TickReport {
    loop {
        reports.changed().await.expect("scheduler alive");
        let latest = reports.borrow_and_update().clone();
        if let Some(report) = latest {
            if report.tick > after {
                return report;
            }
        }
    }
}

fn inject(handle: &EngineHandle, key: &str, strength: f64) {
    handle
        .inject_stimulus(key, strength, EntityId::DEFAULT, BTreeMap::new(), None)
        .expect("queued");
}

#[tokio::test(start_paused = true)]
async fn test_stimulus_preempts_dormant_wait() {
    let config = SchedulerConfig::default();
    let min_tick = config.min_tick();
    let handle = Scheduler::spawn(engine_with(&["a"]), config).expect("spawn");

    // Ten minutes without input: the cadence has stretched to its maximum.
    tokio::time::sleep(Duration::from_secs(600)).await;
    let dormant_ticks = handle.view().tick;
    assert!(dormant_ticks > 0);
    assert!(dormant_ticks < 1_000, "ticked {} times while dormant", dormant_ticks);

    let mut reports = handle.subscribe_reports();
    let start = Instant::now();
    inject(&handle, "a", 1.0);
    let report = next_report(&mut reports, dormant_ticks).await;

    assert!(start.elapsed() <= min_tick + TIMER_SLACK, "latency {:?}", start.elapsed());
    assert!(report.total_energy > 0.0);
    assert_eq!(handle.view().metrics.stimuli_applied, 1);
    handle.shutdown().await.expect("engine");
}

#[tokio::test(start_paused = true)]
async fn test_interval_grows_from_min_to_max() {
    let config = SchedulerConfig::default();
    let (min_tick, max_tick) = (config.min_tick(), config.max_tick());
    let handle = Scheduler::spawn(engine_with(&["a"]), config).expect("spawn");
    let mut reports = handle.subscribe_reports();

    let start = Instant::now();
    inject(&handle, "a", 1.0);
    let mut last = next_report(&mut reports, 0).await.tick;
    let mut at = Instant::now();
    let mut gaps = Vec::new();
    // Dormancy reaches the idle regime after 100s with the default curve.
    while start.elapsed() < Duration::from_secs(150) {
        let report = next_report(&mut reports, last).await;
        let now = Instant::now();
        gaps.push(now - at);
        at = now;
        last = report.tick;
    }

    let near = |gap: Duration, expected: Duration| gap >= expected && gap <= expected + TIMER_SLACK;
    assert!(near(gaps[0], min_tick), "first gap {:?}", gaps[0]);
    assert!(gaps.iter().all(|g| *g >= min_tick && *g <= max_tick + TIMER_SLACK));
    let last_gap = *gaps.last().expect("gaps");
    assert!(near(last_gap, max_tick), "last gap {:?}", last_gap);
    // Never speeds up again without a stimulus.
    assert!(gaps.windows(2).all(|w| w[1] + TIMER_SLACK >= w[0]));
    handle.shutdown().await.expect("engine");
}

#[tokio::test(start_paused = true)]
async fn test_flood_on_one_node_is_coalesced() {
    let handle = Scheduler::spawn(engine_with(&["a"]), SchedulerConfig::default()).expect("spawn");
    for i in 1..=50 {
        inject(&handle, "a", i as f64 * 0.1);
    }
    tokio::time::sleep(Duration::from_millis(1)).await;

    let view = handle.view();
    assert_eq!(view.metrics.stimuli_applied, 1);
    assert_eq!(view.metrics.stimuli_coalesced, 49);
    // The merged stimulus carries the strongest strength.
    let energy = handle.get_node_energy(NodeId(0), EntityId::DEFAULT).expect("node");
    assert!((energy - 5.0).abs() < 1e-9);
    handle.shutdown().await.expect("engine");
}

#[tokio::test(start_paused = true)]
async fn test_spaced_flood_is_debounced_across_batches() {
    let config = SchedulerConfig::default();
    assert!(config.debounce_window_ms >= 100);
    let handle = Scheduler::spawn(engine_with(&["a"]), config).expect("spawn");

    // Each stimulus is drained on its own before the next one arrives.
    for _ in 0..10 {
        inject(&handle, "a", 1.0);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let view = handle.view();
    assert_eq!(view.metrics.stimuli_applied, 1);
    assert_eq!(view.metrics.stimuli_coalesced, 9);
    let energy = handle.get_node_energy(NodeId(0), EntityId::DEFAULT).expect("node");
    assert!((energy - 1.0).abs() < 1e-9, "energy = {}", energy);
    handle.shutdown().await.expect("engine");
}

#[tokio::test(start_paused = true)]
async fn test_expired_stimulus_is_dropped() {
    let handle = Scheduler::spawn(engine_with(&["a"]), SchedulerConfig::default()).expect("spawn");
    let past = chrono::Utc::now() - chrono::Duration::seconds(5);
    handle
        .submit(Stimulus::new("a", 1.0).with_deadline(past))
        .expect("queued");
    tokio::time::sleep(Duration::from_millis(1)).await;

    let view = handle.view();
    assert_eq!(view.metrics.stimuli_expired, 1);
    assert_eq!(view.metrics.stimuli_applied, 0);
    assert_eq!(view.total_energy(), 0.0);
    handle.shutdown().await.expect("engine");
}

#[tokio::test(start_paused = true)]
async fn test_autosave_and_reload_from_store() {
    let store = Arc::new(MemorySnapshotStore::new());
    let config = SchedulerConfig {
        autosave_every_ticks: 2,
        ..SchedulerConfig::default()
    };
    let handle = Scheduler::spawn_with_store(engine_with(&["a", "b"]), config, store.clone())
        .expect("spawn");
    let mut reports = handle.subscribe_reports();
    next_report(&mut reports, 1).await;

    assert!(store.has_snapshot());
    assert!(matches!(
        handle.durability(),
        DurabilityStatus::Healthy { last_saved_tick: 2 }
    ));

    handle.create_node(NodeRequest::new("c")).await.expect("node");
    assert_eq!(handle.view().node_count, 3);
    handle.load_from_store().await.expect("load");
    assert_eq!(handle.view().node_count, 2);
    // The directory follows the load: "c" no longer resolves.
    let err = handle
        .inject_stimulus("c", 1.0, EntityId::DEFAULT, BTreeMap::new(), None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidReference(_)));
    handle.shutdown().await.expect("engine");
}

#[derive(Debug)]
struct BrokenDisk;

impl SnapshotStore for BrokenDisk {
    fn save(&self, _snapshot: &GraphSnapshot) -> Result<(), PersistenceError> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into())
    }

    fn load(&self) -> Result<GraphSnapshot, PersistenceError> {
        Err(PersistenceError::Missing(self.describe()))
    }

    fn describe(&self) -> String {
        "broken disk".to_string()
    }
}

#[tokio::test(start_paused = true)]
async fn test_failing_store_degrades_but_keeps_running() {
    let config = SchedulerConfig {
        autosave_every_ticks: 1,
        ..SchedulerConfig::default()
    };
    let handle = Scheduler::spawn_with_store(engine_with(&["a"]), config, Arc::new(BrokenDisk))
        .expect("spawn");
    let mut reports = handle.subscribe_reports();
    next_report(&mut reports, 2).await;

    match handle.durability() {
        DurabilityStatus::Degraded {
            since_tick,
            failures,
            error,
        } => {
            assert_eq!(since_tick, 1);
            assert!(failures >= 3);
            assert!(error.contains("disk full"));
        }
        other => panic!("expected degraded durability, got {:?}", other),
    }

    let err = handle.save_snapshot().await.unwrap_err();
    assert!(matches!(err, EngineError::Persistence(PersistenceError::Io(_))));
    assert!(err.is_recoverable());

    // Still ticking in memory.
    inject(&handle, "a", 1.0);
    let report = next_report(&mut reports, 3).await;
    assert!(report.total_energy > 0.0);
    handle.shutdown().await.expect("engine");
}
