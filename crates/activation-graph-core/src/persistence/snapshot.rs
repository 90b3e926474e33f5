//! Snapshot records exchanged with a backing graph store.
//!
//! A snapshot is a flat, self-describing copy of the working graph: nodes in
//! arena order with their energy channels, links keyed by endpoint node keys
//! with all learning metadata, and the engine clock. Node ids are positional,
//! so a restored graph hands out the same `NodeId`s it had when captured.
//! Link ids are reassigned on restore.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::graph::{GraphStore, NewLink, NewNode};
use crate::types::{CreationReason, Embedding, EntityId, LinkType};

/// Format version written by this build.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One node, in arena order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: String,
    pub node_type: String,
    #[serde(default)]
    pub embedding: Embedding,
    pub base_weight: f64,
    #[serde(default)]
    pub energy: BTreeMap<EntityId, f64>,
    #[serde(default)]
    pub last_activation_tick: Option<u64>,
    pub created_tick: u64,
}

/// One link, endpoints by node key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
    pub link_type: LinkType,
    pub weight: f64,
    #[serde(default)]
    pub affect: Option<Embedding>,
    pub creation_reason: CreationReason,
    pub confidence: f64,
    pub created_tick: u64,
    #[serde(default)]
    pub last_traversed_tick: Option<u64>,
    pub probation_start_tick: u64,
    pub graduated: bool,
}

/// Full working-graph snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub format_version: u32,
    pub snapshot_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Engine tick at capture.
    pub tick: u64,
    /// Engine integration clock at capture; link weights are current to it.
    pub clock: f64,
    pub w_max: f64,
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

impl GraphSnapshot {
    /// Copy the store. Link weights are taken as stored, so callers bring
    /// lazily decayed links up to `clock` first.
    pub fn capture(store: &GraphStore, tick: u64, clock: f64) -> Self {
        let nodes = store
            .nodes()
            .map(|node| NodeRecord {
                key: node.key.clone(),
                node_type: node.node_type.clone(),
                embedding: node.embedding.clone(),
                base_weight: node.base_weight,
                energy: node.energies().clone(),
                last_activation_tick: node.last_activation_tick,
                created_tick: node.created_tick,
            })
            .collect();

        let mut links: Vec<LinkRecord> = store
            .links()
            .filter_map(|link| {
                let source = store.node(link.source).ok()?;
                let target = store.node(link.target).ok()?;
                Some(LinkRecord {
                    source: source.key.clone(),
                    target: target.key.clone(),
                    link_type: link.link_type,
                    weight: link.weight,
                    affect: link.affect.clone(),
                    creation_reason: link.creation_reason,
                    confidence: link.confidence,
                    created_tick: link.created_tick,
                    last_traversed_tick: link.last_traversed_tick,
                    probation_start_tick: link.probation_start_tick,
                    graduated: link.graduated,
                })
            })
            .collect();
        // Slot order depends on removal history; keep the file stable.
        links.sort_by(|a, b| {
            (a.source.as_str(), a.target.as_str(), a.link_type)
                .cmp(&(b.source.as_str(), b.target.as_str(), b.link_type))
        });

        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot_id: Uuid::new_v4(),
            created_at: Utc::now(),
            tick,
            clock,
            w_max: store.w_max(),
            nodes,
            links,
        }
    }

    /// Rebuild a store from the records.
    ///
    /// Every record is checked: version, unique keys, finite non-negative
    /// energies, link endpoints that exist, weights in `[0, w_max)` and no
    /// duplicate (source, target, type) triples. Nothing is returned unless
    /// the whole snapshot is valid.
    ///
    /// # Errors
    /// - `UnsupportedVersion` for a different format version
    /// - `Corrupted` naming the first offending record
    pub fn restore(&self) -> Result<GraphStore, PersistenceError> {
        self.restore_with(self.w_max)
    }

    /// Like [`restore`](Self::restore), but links must fit under `w_max`
    /// instead of the recorded ceiling.
    pub fn restore_with(&self, w_max: f64) -> Result<GraphStore, PersistenceError> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                expected: SNAPSHOT_FORMAT_VERSION,
                found: self.format_version,
            });
        }
        if !w_max.is_finite() || w_max <= 0.0 {
            return Err(corrupted("header", format!("w_max must be > 0, got {}", w_max)));
        }
        if !self.clock.is_finite() || self.clock < 0.0 {
            return Err(corrupted("header", format!("clock must be >= 0, got {}", self.clock)));
        }

        let mut store = GraphStore::new(w_max);
        for (position, record) in self.nodes.iter().enumerate() {
            let location = format!("nodes[{}]", position);
            let id = store
                .add_node(NewNode {
                    key: record.key.clone(),
                    node_type: record.node_type.clone(),
                    embedding: record.embedding.clone(),
                    base_weight: record.base_weight,
                    created_tick: record.created_tick,
                })
                .map_err(|e| corrupted(&location, e.to_string()))?;

            if let Some((entity, value)) = record
                .energy
                .iter()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(corrupted(
                    &location,
                    format!("channel {} has invalid energy {}", entity, value),
                ));
            }
            let energy: BTreeMap<EntityId, f64> = record
                .energy
                .iter()
                .filter(|(_, v)| **v > 0.0)
                .map(|(e, v)| (*e, *v))
                .collect();
            store
                .replace_energy(id, energy)
                .map_err(|e| corrupted(&location, e.to_string()))?;
            store
                .node_mut(id)
                .map_err(|e| corrupted(&location, e.to_string()))?
                .last_activation_tick = record.last_activation_tick;
        }

        let mut seen = HashSet::new();
        for (position, record) in self.links.iter().enumerate() {
            let location = format!("links[{}]", position);
            let triple = (record.source.as_str(), record.target.as_str(), record.link_type);
            if !seen.insert(triple) {
                return Err(corrupted(
                    &location,
                    format!(
                        "duplicate link {} -> {} ({})",
                        record.source, record.target, record.link_type
                    ),
                ));
            }
            let source = store.node_by_key(&record.source).map_err(|_| {
                corrupted(&location, format!("unknown source node '{}'", record.source))
            })?;
            let target = store.node_by_key(&record.target).map_err(|_| {
                corrupted(&location, format!("unknown target node '{}'", record.target))
            })?;
            let id = store
                .add_link(NewLink {
                    source,
                    target,
                    link_type: record.link_type,
                    weight: record.weight,
                    affect: record.affect.clone(),
                    creation_reason: record.creation_reason,
                    confidence: record.confidence,
                    created_tick: record.created_tick,
                    graduated: record.graduated,
                    clock: self.clock,
                })
                .map_err(|e| corrupted(&location, e.to_string()))?;
            let link = store
                .link_mut(id)
                .map_err(|e| corrupted(&location, e.to_string()))?;
            link.last_traversed_tick = record.last_traversed_tick;
            link.probation_start_tick = record.probation_start_tick;
        }

        Ok(store)
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sum of all channel energies across nodes.
    pub fn total_energy(&self) -> f64 {
        self.nodes
            .iter()
            .flat_map(|n| n.energy.values())
            .sum()
    }
}

fn corrupted(location: &str, details: impl Into<String>) -> PersistenceError {
    PersistenceError::Corrupted {
        location: location.to_string(),
        details: details.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityId, NodeId};

    fn sample_store() -> GraphStore {
        let mut store = GraphStore::new(1.0);
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            store
                .add_node(NewNode {
                    key: key.to_string(),
                    node_type: "concept".into(),
                    embedding: vec![i as f32, 1.0],
                    base_weight: 1.0,
                    created_tick: i as u64,
                })
                .unwrap();
        }
        let ab = store
            .add_link(NewLink {
                source: NodeId(0),
                target: NodeId(1),
                link_type: LinkType::Associative,
                weight: 0.4,
                affect: None,
                creation_reason: CreationReason::Coactivation,
                confidence: 0.7,
                created_tick: 3,
                graduated: false,
                clock: 0.0,
            })
            .unwrap();
        store.link_mut(ab).unwrap().last_traversed_tick = Some(9);
        store
            .add_link(NewLink {
                source: NodeId(1),
                target: NodeId(2),
                link_type: LinkType::Causal,
                weight: 0.8,
                affect: Some(vec![0.5, 0.5]),
                creation_reason: CreationReason::Explicit,
                confidence: 1.0,
                created_tick: 0,
                graduated: true,
                clock: 0.0,
            })
            .unwrap();
        store.add_energy(NodeId(0), EntityId(1), 2.5).unwrap();
        store.add_energy(NodeId(2), EntityId(4), 0.25).unwrap();
        store
    }

    #[test]
    fn test_capture_restore_preserves_graph() {
        let store = sample_store();
        let snapshot = GraphSnapshot::capture(&store, 12, 11.5);
        let restored = GraphSnapshot::from_json(&snapshot.to_json().unwrap())
            .unwrap()
            .restore()
            .unwrap();

        assert_eq!(restored.node_count(), 3);
        assert_eq!(restored.link_count(), 2);
        assert_eq!(restored.energy(NodeId(0), EntityId(1)).unwrap(), 2.5);
        assert_eq!(restored.energy(NodeId(2), EntityId(4)).unwrap(), 0.25);
        assert_eq!(restored.node_by_key("c").unwrap(), NodeId(2));

        let ab = restored
            .find_link(NodeId(0), NodeId(1), LinkType::Associative)
            .unwrap();
        let link = restored.link(ab).unwrap();
        assert_eq!(link.weight, 0.4);
        assert_eq!(link.last_traversed_tick, Some(9));
        assert_eq!(link.probation_start_tick, 3);
        assert!(!link.graduated);
        assert_eq!(link.decay_clock, 11.5);
        assert!((snapshot.total_energy() - 2.75).abs() < 1e-12);
    }

    #[test]
    fn test_restore_rejects_unknown_endpoint() {
        let mut snapshot = GraphSnapshot::capture(&sample_store(), 0, 0.0);
        snapshot.links[0].target = "ghost".into();
        let err = snapshot.restore().unwrap_err();
        match err {
            PersistenceError::Corrupted { location, details } => {
                assert_eq!(location, "links[0]");
                assert!(details.contains("ghost"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_restore_rejects_duplicate_triple() {
        let mut snapshot = GraphSnapshot::capture(&sample_store(), 0, 0.0);
        let dup = snapshot.links[0].clone();
        snapshot.links.push(dup);
        assert!(matches!(
            snapshot.restore(),
            Err(PersistenceError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_restore_rejects_negative_energy_and_bad_weight() {
        let mut snapshot = GraphSnapshot::capture(&sample_store(), 0, 0.0);
        snapshot.nodes[1].energy.insert(EntityId(0), -1.0);
        assert!(snapshot.restore().is_err());

        let mut snapshot = GraphSnapshot::capture(&sample_store(), 0, 0.0);
        snapshot.links[1].weight = 1.0;
        assert!(snapshot.restore().is_err());
    }

    #[test]
    fn test_restore_with_lower_ceiling() {
        let snapshot = GraphSnapshot::capture(&sample_store(), 0, 0.0);
        assert!(snapshot.restore_with(0.9).is_ok());
        // The causal link sits at 0.8.
        assert!(snapshot.restore_with(0.5).is_err());
    }

    #[test]
    fn test_restore_rejects_other_version() {
        let mut snapshot = GraphSnapshot::capture(&sample_store(), 0, 0.0);
        snapshot.format_version = 99;
        assert!(matches!(
            snapshot.restore(),
            Err(PersistenceError::UnsupportedVersion { expected: 1, found: 99 })
        ));
    }

    #[test]
    fn test_links_sorted_by_key() {
        let snapshot = GraphSnapshot::capture(&sample_store(), 0, 0.0);
        let pairs: Vec<(&str, &str)> = snapshot
            .links
            .iter()
            .map(|l| (l.source.as_str(), l.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "b"), ("b", "c")]);
    }
}
