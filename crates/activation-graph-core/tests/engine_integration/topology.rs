//! Structural learning through the engine: coactivation links appear for
//! co-driven nodes, wither on probation and never shadow explicit links.

use activation_graph_core::config::EngineConfig;
use activation_graph_core::engine::Engine;
use activation_graph_core::topology::ExplicitLink;
use activation_graph_core::types::{CreationReason, EntityId, LinkType, NodeId};

use crate::common::add_nodes;

fn structural_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.criticality.enabled = false;
    config.learning.enabled = false;
    config.topology.probation_ticks = 30;
    config
}

/// Same rising-and-falling pattern into both nodes, `b` a constant factor
/// harder, so their energies stay perfectly correlated.
fn drive(engine: &mut Engine, a: NodeId, b: NodeId, ticks: u64) {
    for _ in 0..ticks {
        let phase = 1.0 + (engine.current_tick() as f64 * 0.5).sin();
        engine.inject_energy(a, EntityId::DEFAULT, phase).expect("inject");
        engine.inject_energy(b, EntityId::DEFAULT, phase * 1.1).expect("inject");
        engine.tick(1.0).expect("tick");
    }
}

#[test]
fn test_coactivation_link_created_then_pruned() {
    let mut engine = Engine::new(structural_config()).expect("engine");
    let ids = add_nodes(&mut engine, 2);

    drive(&mut engine, ids[0], ids[1], 20);
    assert_eq!(engine.metrics().links_created_coactivation, 1);
    assert!(engine.graph().are_linked(ids[0], ids[1]));
    let link = engine.graph().links().next().expect("created link").clone();
    assert_eq!(link.creation_reason, CreationReason::Coactivation);
    assert_eq!(link.link_type, LinkType::Associative);
    assert!(link.is_probationary());
    assert_eq!(link.created_tick, 20);

    // Stop driving. Nothing strengthens the link, so it expires once its
    // probation is over (prune sweep at tick 50).
    for _ in 0..35 {
        engine.tick(1.0).expect("tick");
    }
    assert_eq!(engine.current_tick(), 55);
    assert_eq!(engine.graph().link_count(), 0);
    assert_eq!(engine.metrics().links_pruned, 1);
}

#[test]
fn test_explicit_link_takes_precedence() {
    let mut engine = Engine::new(structural_config()).expect("engine");
    let ids = add_nodes(&mut engine, 2);
    let id = engine
        .create_link(ExplicitLink::new(ids[0], ids[1], LinkType::Causal))
        .expect("explicit");

    drive(&mut engine, ids[0], ids[1], 40);
    assert_eq!(engine.metrics().links_created_coactivation, 0);
    assert_eq!(engine.graph().link_count(), 1);

    let link = engine.graph().link(id).expect("explicit link survives");
    assert_eq!(link.creation_reason, CreationReason::Explicit);
    assert!(link.graduated);
    assert_eq!(engine.metrics().links_created_explicit, 1);
}

#[test]
fn test_disabled_topology_never_changes_structure() {
    let mut config = structural_config();
    config.topology.enabled = false;
    let mut engine = Engine::new(config).expect("engine");
    let ids = add_nodes(&mut engine, 2);

    drive(&mut engine, ids[0], ids[1], 60);
    assert_eq!(engine.graph().link_count(), 0);
    assert_eq!(engine.metrics().links_created(), 0);
}
