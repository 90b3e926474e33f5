use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::config::EmergenceConfig;
use crate::graph::{Frontier, GraphStore, NewLink, NewNode};
use crate::types::{CreationReason, EntityId, LinkType, NodeId};

const FLOOR: f64 = 0.01;

fn store(n: usize) -> GraphStore {
    let mut store = GraphStore::new(1.0);
    for i in 0..n {
        store
            .add_node(NewNode {
                key: format!("n{}", i),
                node_type: "concept".into(),
                embedding: vec![],
                base_weight: 1.0,
                created_tick: 0,
            })
            .unwrap();
    }
    store
}

fn link(store: &mut GraphStore, a: u32, b: u32, weight: f64) {
    store
        .add_link(NewLink {
            source: NodeId(a),
            target: NodeId(b),
            link_type: LinkType::Associative,
            weight,
            affect: None,
            creation_reason: CreationReason::Explicit,
            confidence: 1.0,
            created_tick: 0,
            graduated: true,
            clock: 0.0,
        })
        .unwrap();
}

fn energize(store: &mut GraphStore, id: u32, entity: u32, amount: f64) {
    store.add_energy(NodeId(id), EntityId(entity), amount).unwrap();
}

fn detect(detector: &mut EntityDetector, store: &GraphStore, tick: u64) -> DetectionOutcome {
    detector.detect(store, &Frontier::collect(store, FLOOR), tick)
}

fn candidate(nodes: &[u32], score: f64) -> CandidateCluster {
    CandidateCluster {
        entity: EntityId::DEFAULT,
        nodes: nodes.iter().map(|i| NodeId(*i)).collect(),
        energy: score,
        coherence: Coherence {
            density: 1.0,
            boundary: 1.0,
            tightness: 1.0,
        },
        score,
        embedding: None,
    }
}

fn reading(tau: f64) -> ThresholdReading {
    ThresholdReading {
        effective: tau,
        raw: tau,
    }
}

#[test]
fn test_single_node_never_emerges() {
    let mut s = store(3);
    energize(&mut s, 0, 0, 1_000.0);
    let mut detector = EntityDetector::new(EmergenceConfig::default());
    let out = detect(&mut detector, &s, 1);
    assert!(out.clusters.is_empty());
    assert!(out.emerged.is_empty());
}

#[test]
fn test_linked_pair_emerges_then_stays_active() {
    let mut s = store(2);
    link(&mut s, 0, 1, 0.5);
    energize(&mut s, 0, 0, 1.0);
    energize(&mut s, 1, 0, 1.0);
    let mut detector = EntityDetector::new(EmergenceConfig::default());

    let first = detect(&mut detector, &s, 1);
    assert_eq!(first.clusters.len(), 1);
    let cluster = &first.clusters[0];
    assert_eq!(cluster.lifecycle, ClusterLifecycle::Emerging);
    assert_eq!(cluster.nodes, vec![NodeId(0), NodeId(1)]);
    assert_eq!(cluster.coherence.density, 1.0);
    assert_eq!(cluster.coherence.boundary, 1.0);
    assert!((cluster.score - 2.0).abs() < 1e-12);
    assert_eq!(cluster.cost, 2.0);
    assert_eq!(first.emerged, vec![cluster.id]);

    let second = detect(&mut detector, &s, 2);
    assert_eq!(second.clusters[0].id, cluster.id);
    assert_eq!(second.clusters[0].lifecycle, ClusterLifecycle::Active);
    assert_eq!(second.clusters[0].emerged_tick, Some(1));
    assert!(second.emerged.is_empty());
}

#[test]
fn test_channels_do_not_merge() {
    let mut s = store(3);
    link(&mut s, 0, 1, 0.5);
    link(&mut s, 1, 2, 0.5);
    energize(&mut s, 0, 1, 1.0);
    energize(&mut s, 1, 1, 1.0);
    energize(&mut s, 2, 2, 1.0);

    let mut detector = EntityDetector::new(EmergenceConfig::default());
    let out = detect(&mut detector, &s, 1);
    assert_eq!(out.clusters.len(), 1);
    assert_eq!(out.clusters[0].entity, EntityId(1));
    assert_eq!(out.clusters[0].nodes, vec![NodeId(0), NodeId(1)]);
    // The link to node 2 counts as boundary weight.
    assert!((out.clusters[0].coherence.boundary - 0.5).abs() < 1e-12);
}

#[test]
fn test_identity_survives_growth() {
    let mut s = store(3);
    link(&mut s, 0, 1, 0.5);
    link(&mut s, 1, 2, 0.5);
    energize(&mut s, 0, 0, 1.0);
    energize(&mut s, 1, 0, 1.0);
    let mut detector = EntityDetector::new(EmergenceConfig::default());
    let id = detect(&mut detector, &s, 1).clusters[0].id;

    energize(&mut s, 2, 0, 1.0);
    let out = detect(&mut detector, &s, 2);
    assert_eq!(out.clusters[0].nodes.len(), 3);
    assert_eq!(out.clusters[0].id, id);
    assert_eq!(out.clusters[0].lifecycle, ClusterLifecycle::Active);
}

#[test]
fn test_entry_and_exit_hysteresis() {
    let mut detector = EntityDetector::new(EmergenceConfig::default());
    let steps = [
        (1.05, ClusterLifecycle::Dormant),
        (1.15, ClusterLifecycle::Emerging),
        (0.95, ClusterLifecycle::Active),
        (1.05, ClusterLifecycle::Active),
        (0.85, ClusterLifecycle::Dissolving),
        (1.05, ClusterLifecycle::Dormant),
    ];
    let mut id = None;
    for (tick, (score, expected)) in steps.into_iter().enumerate() {
        let out = detector.classify(vec![candidate(&[0, 1], score)], reading(1.0), tick as u64);
        assert_eq!(out.clusters[0].lifecycle, expected, "tick {}", tick);
        let current = out.clusters[0].id;
        assert_eq!(*id.get_or_insert(current), current);
    }
}

#[test]
fn test_entity_cap_keeps_highest_scores() {
    let config = EmergenceConfig {
        max_entities: 2,
        ..EmergenceConfig::default()
    };
    let mut detector = EntityDetector::new(config);
    let out = detector.classify(
        vec![
            candidate(&[0, 1], 3.0),
            candidate(&[2, 3], 5.0),
            candidate(&[4, 5], 4.0),
        ],
        reading(1.0),
        1,
    );
    let emerged: Vec<f64> = out.emerged_clusters().map(|c| c.score).collect();
    assert_eq!(emerged, vec![5.0, 4.0]);
    assert_eq!(out.capped, 1);
    assert_eq!(out.emerged.len(), 2);
}

#[test]
fn test_vanished_cluster_is_reported_dissolved() {
    let mut s = store(2);
    link(&mut s, 0, 1, 0.5);
    energize(&mut s, 0, 0, 1.0);
    energize(&mut s, 1, 0, 1.0);
    let mut detector = EntityDetector::new(EmergenceConfig::default());
    let id = detect(&mut detector, &s, 1).clusters[0].id;

    s.replace_energy(NodeId(0), BTreeMap::new()).unwrap();
    s.replace_energy(NodeId(1), BTreeMap::new()).unwrap();
    let out = detect(&mut detector, &s, 2);
    assert!(out.clusters.is_empty());
    assert_eq!(out.dissolved.len(), 1);
    assert_eq!(out.dissolved[0].id, id);
    assert_eq!(out.dissolved[0].lifecycle, ClusterLifecycle::Dissolving);
    assert!(detector.tracked().is_empty());
}

#[test]
fn test_min_energy_gate() {
    let config = EmergenceConfig {
        score_floor: 0.001,
        ..EmergenceConfig::default()
    };
    let mut s = store(2);
    link(&mut s, 0, 1, 0.5);
    energize(&mut s, 0, 0, 0.02);
    energize(&mut s, 1, 0, 0.02);
    let mut detector = EntityDetector::new(config);
    let out = detect(&mut detector, &s, 1);
    assert_eq!(out.clusters.len(), 1);
    assert_eq!(out.clusters[0].lifecycle, ClusterLifecycle::Dormant);
}

#[test]
fn test_random_graphs_never_yield_solo_clusters() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..20 {
        let n = 40;
        let mut s = store(n);
        for a in 0..n as u32 {
            for b in 0..n as u32 {
                if a != b && rng.gen_bool(0.05) {
                    link(&mut s, a, b, rng.gen_range(0.01..0.9));
                }
            }
        }
        for id in 0..n as u32 {
            if rng.gen_bool(0.6) {
                energize(&mut s, id, rng.gen_range(0..3), rng.gen_range(0.0..2.0));
            }
        }
        let mut detector = EntityDetector::new(EmergenceConfig::default());
        for tick in 0..3 {
            let out = detect(&mut detector, &s, tick);
            for cluster in &out.clusters {
                assert!(cluster.len() >= 2);
                for node in &cluster.nodes {
                    let (dominant, _) = s.node(*node).unwrap().dominant_entity().unwrap();
                    assert_eq!(dominant, cluster.entity);
                }
            }
        }
    }
}
