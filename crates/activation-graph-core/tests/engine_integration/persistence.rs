//! Snapshots written to disk and restored into a fresh engine.

use activation_graph_core::engine::Engine;
use activation_graph_core::error::{EngineError, PersistenceError};
use activation_graph_core::persistence::{JsonFileStore, SnapshotStore};
use activation_graph_core::types::EntityId;
use tempfile::TempDir;

use crate::common::{quiet_config, random_graph, seeded};

#[test]
fn test_file_round_trip_into_fresh_engine() {
    let tmp = TempDir::new().expect("create temp dir");
    let store = JsonFileStore::new(tmp.path().join("graph").join("snapshot.json"));

    let mut engine = Engine::new(quiet_config()).expect("engine");
    let mut rng = seeded(5);
    let ids = random_graph(&mut engine, &mut rng, 12, 30);
    engine.inject_energy(ids[0], EntityId(0), 2.0).expect("inject");
    engine.inject_energy(ids[5], EntityId(1), 1.0).expect("inject");
    for _ in 0..6 {
        engine.tick(1.0).expect("tick");
    }

    let snapshot = engine.save_snapshot();
    store.save(&snapshot).expect("save");
    assert!(store.path().exists());

    let mut restored = Engine::new(quiet_config()).expect("engine");
    restored.load_snapshot(&store.load().expect("load")).expect("restore");

    assert_eq!(restored.current_tick(), 6);
    assert_eq!(restored.clock(), engine.clock());
    assert_eq!(restored.graph().node_count(), 12);
    assert_eq!(restored.graph().link_count(), engine.graph().link_count());
    for id in &ids {
        for entity in [EntityId(0), EntityId(1)] {
            let a = engine.node_energy(*id, entity).expect("node");
            let b = restored.node_energy(*id, entity).expect("node");
            assert!((a - b).abs() < 1e-12, "{} channel {}: {} vs {}", id, entity, a, b);
        }
    }
    for link in engine.graph().links() {
        let other = restored
            .graph()
            .find_link(link.source, link.target, link.link_type)
            .and_then(|id| restored.graph().link(id).ok())
            .expect("same triple restored");
        assert!((link.weight - other.weight).abs() < 1e-12);
        assert_eq!(link.graduated, other.graduated);
    }

    // Both engines continue identically.
    let a = engine.tick(1.0).expect("tick").total_energy;
    let b = restored.tick(1.0).expect("tick").total_energy;
    assert!((a - b).abs() < 1e-9);
}

#[test]
fn test_garbage_file_is_rejected_and_engine_kept() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("snapshot.json");
    std::fs::write(&path, b"{\"format_version\": 1, \"nodes\": [").expect("write");
    let store = JsonFileStore::new(&path);

    let err = store.load().unwrap_err();
    assert!(matches!(err, PersistenceError::Serialization(_)));

    let mut engine = Engine::new(quiet_config()).expect("engine");
    let mut rng = seeded(9);
    random_graph(&mut engine, &mut rng, 4, 4);
    let mut snapshot = engine.save_snapshot();
    snapshot.format_version += 1;
    let err = engine.load_snapshot(&snapshot).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Persistence(PersistenceError::UnsupportedVersion { .. })
    ));
    assert_eq!(engine.graph().node_count(), 4);
}

#[test]
fn test_missing_file_reports_missing() {
    let tmp = TempDir::new().expect("create temp dir");
    let store = JsonFileStore::new(tmp.path().join("absent.json"));
    assert!(matches!(store.load(), Err(PersistenceError::Missing(_))));
}
