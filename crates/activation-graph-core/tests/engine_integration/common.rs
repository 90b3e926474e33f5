//! Common test utilities for integration tests.
//!
//! Provides engine configurations and small graph shapes shared by the
//! suites.

use activation_graph_core::config::EngineConfig;
use activation_graph_core::engine::{Engine, NodeRequest, TickReport};
use activation_graph_core::topology::ExplicitLink;
use activation_graph_core::types::{LinkType, NodeId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// No controller, no structural change, no decay of any kind.
pub fn quiet_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.criticality.enabled = false;
    config.topology.enabled = false;
    config.learning.enabled = false;
    config.diffusion.decay_state_rate_init = 0.0;
    config.diffusion.decay_weight_rate_init = 0.0;
    config
}

/// Fixed weights and topology, so ρ depends only on α and δ.
pub fn controller_only_config(state_decay: f64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.topology.enabled = false;
    config.learning.enabled = false;
    config.criticality.per_entity = false;
    config.diffusion.decay_weight_rate_init = 0.0;
    config.diffusion.decay_state_rate_init = state_decay;
    config
}

pub fn add_nodes(engine: &mut Engine, n: usize) -> Vec<NodeId> {
    (0..n)
        .map(|i| {
            engine
                .create_node(NodeRequest::new(format!("n{}", i)))
                .expect("create node")
        })
        .collect()
}

pub fn link(engine: &mut Engine, from: NodeId, to: NodeId, weight: f64) {
    let mut request = ExplicitLink::new(from, to, LinkType::Associative);
    request.weight = Some(weight);
    engine.create_link(request).expect("create link");
}

/// Complete directed graph: every node has `n - 1` out-links of `weight`.
pub fn complete_graph(engine: &mut Engine, n: usize, weight: f64) -> Vec<NodeId> {
    let ids = add_nodes(engine, n);
    for a in &ids {
        for b in &ids {
            if a != b {
                link(engine, *a, *b, weight);
            }
        }
    }
    ids
}

/// Seeded random graph with 2-d embeddings and random link weights.
pub fn random_graph(engine: &mut Engine, rng: &mut ChaCha8Rng, n: usize, links: usize) -> Vec<NodeId> {
    let ids: Vec<NodeId> = (0..n)
        .map(|i| {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            engine
                .create_node(
                    NodeRequest::new(format!("r{}", i))
                        .with_embedding(vec![angle.cos(), angle.sin()]),
                )
                .expect("create node")
        })
        .collect();
    let mut created = 0;
    while created < links {
        let a = ids[rng.gen_range(0..n)];
        let b = ids[rng.gen_range(0..n)];
        if a == b || engine.graph().are_linked(a, b) {
            continue;
        }
        link(engine, a, b, rng.gen_range(0.05..0.9));
        created += 1;
    }
    ids
}

pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Assert the structural invariants every tick must keep.
pub fn assert_tick_invariants(engine: &Engine, report: &TickReport) {
    let w_max = engine.config().learning.w_max;
    for node in engine.graph().nodes() {
        for (entity, energy) in node.energies() {
            assert!(
                energy.is_finite() && *energy >= 0.0,
                "tick {}: node {} channel {} has energy {}",
                report.tick,
                node.id,
                entity,
                energy
            );
        }
    }
    for link in engine.graph().links() {
        assert!(
            link.weight >= 0.0 && link.weight < w_max,
            "tick {}: link {} weight {} outside [0, {})",
            report.tick,
            link.id,
            link.weight,
            w_max
        );
    }
    for cluster in &engine.clusters().clusters {
        assert!(cluster.len() >= 2, "tick {}: solo cluster {}", report.tick, cluster.id);
    }

    let workspace = engine.workspace();
    assert!(
        workspace.total_cost <= workspace.capacity + 1e-9,
        "tick {}: workspace cost {} over capacity {}",
        report.tick,
        workspace.total_cost,
        workspace.capacity
    );
    for entry in &workspace.entries {
        assert!(entry.nodes.len() >= 2, "tick {}: solo workspace entry", report.tick);
    }
    assert!(report.total_energy.is_finite());
}
