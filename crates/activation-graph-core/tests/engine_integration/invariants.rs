//! Conservation, non-negativity, weight bounds and cluster shape under
//! long random runs.

use activation_graph_core::config::EngineConfig;
use activation_graph_core::engine::Engine;
use activation_graph_core::stimulus::Stimulus;
use activation_graph_core::types::EntityId;
use rand::Rng;

use crate::common::{assert_tick_invariants, quiet_config, random_graph, seeded};

#[test]
fn test_energy_conserved_without_decay_under_random_stimuli() {
    let mut config = quiet_config();
    // Weights may move; transfer must still conserve.
    config.learning.enabled = true;
    config.learning.peripheral_learning = true;
    let mut engine = Engine::new(config).expect("engine");
    let mut rng = seeded(11);
    let ids = random_graph(&mut engine, &mut rng, 30, 90);

    let mut expected = 0.0;
    for _ in 0..200 {
        for _ in 0..rng.gen_range(0..3) {
            let node = ids[rng.gen_range(0..ids.len())];
            let strength = rng.gen_range(0.1..2.0);
            let entity = EntityId(rng.gen_range(0..3));
            engine
                .apply_stimulus(Stimulus::new(node, strength).with_entity(entity))
                .expect("stimulus");
            expected += strength;
        }
        let report = engine.tick(1.0).expect("tick");
        assert!(
            (report.total_energy - expected).abs() <= 1e-6 * expected.max(1.0),
            "tick {}: total {} expected {}",
            report.tick,
            report.total_energy,
            expected
        );
        assert_tick_invariants(&engine, &report);
    }
}

#[test]
fn test_full_dynamics_keep_invariants() {
    let mut engine = Engine::new(EngineConfig::default()).expect("engine");
    let mut rng = seeded(7);
    let ids = random_graph(&mut engine, &mut rng, 40, 120);

    for _ in 0..300 {
        if rng.gen_bool(0.6) {
            let node = ids[rng.gen_range(0..ids.len())];
            let entity = EntityId(rng.gen_range(0..3));
            engine
                .apply_stimulus(Stimulus::new(node, rng.gen_range(0.5..3.0)).with_entity(entity))
                .expect("stimulus");
        }
        let dt = if rng.gen_bool(0.2) { rng.gen_range(1.0..5.0) } else { 1.0 };
        let report = engine.tick(dt).expect("tick");
        assert_tick_invariants(&engine, &report);
        assert!(report.dt <= engine.config().diffusion.dt_cap);
    }
    assert_eq!(engine.metrics().ticks, 300);
}

#[test]
fn test_diffusion_reaches_only_linked_nodes() {
    let mut engine = Engine::new(quiet_config()).expect("engine");
    let ids = crate::common::add_nodes(&mut engine, 4);
    crate::common::link(&mut engine, ids[0], ids[1], 0.5);
    crate::common::link(&mut engine, ids[1], ids[2], 0.5);
    engine.inject_energy(ids[0], EntityId(0), 1.0).expect("inject");

    for _ in 0..10 {
        engine.tick(1.0).expect("tick");
    }
    assert!(engine.node_energy(ids[2], EntityId(0)).expect("node") > 0.0);
    assert_eq!(engine.node_energy(ids[3], EntityId(0)).expect("node"), 0.0);
    // Other channels stay untouched.
    assert_eq!(engine.node_energy(ids[1], EntityId(1)).expect("node"), 0.0);
}

#[test]
fn test_same_inputs_same_trajectory() {
    fn run() -> Vec<f64> {
        let mut engine = Engine::new(EngineConfig::default()).expect("engine");
        let mut rng = seeded(3);
        let ids = random_graph(&mut engine, &mut rng, 20, 50);
        let mut totals = Vec::new();
        for tick in 0..80 {
            if tick % 5 == 0 {
                let node = ids[rng.gen_range(0..ids.len())];
                engine.apply_stimulus(Stimulus::new(node, 1.5)).expect("stimulus");
            }
            totals.push(engine.tick(1.0).expect("tick").total_energy);
        }
        totals
    }
    let (a, b) = (run(), run());
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0), "{} vs {}", x, y);
    }
}
