//! Graph node with sparse per-entity energy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Embedding, EntityId, NodeId};

/// A node in the working graph.
///
/// Energy is sparse: only channels with non-zero energy have an entry, so a
/// node that belongs to no entity costs nothing per channel. A `BTreeMap` keeps
/// channel iteration ordered, which keeps per-tick sums reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// External key supplied by the creator (unique).
    pub key: String,
    pub node_type: String,
    /// May be empty for nodes without semantic content.
    pub embedding: Embedding,
    /// Permanent, slow-changing importance.
    pub base_weight: f64,
    pub(crate) energy: BTreeMap<EntityId, f64>,
    pub last_activation_tick: Option<u64>,
    pub created_tick: u64,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        key: String,
        node_type: String,
        embedding: Embedding,
        base_weight: f64,
        created_tick: u64,
    ) -> Self {
        Self {
            id,
            key,
            node_type,
            embedding,
            base_weight,
            energy: BTreeMap::new(),
            last_activation_tick: None,
            created_tick,
        }
    }

    /// Energy in one channel (0.0 when the channel is absent).
    #[inline]
    pub fn energy(&self, entity: EntityId) -> f64 {
        self.energy.get(&entity).copied().unwrap_or(0.0)
    }

    /// All non-zero channels.
    pub fn energies(&self) -> &BTreeMap<EntityId, f64> {
        &self.energy
    }

    pub fn total_energy(&self) -> f64 {
        self.energy.values().sum()
    }

    /// Largest single-channel energy.
    pub fn peak_energy(&self) -> f64 {
        self.energy.values().copied().fold(0.0, f64::max)
    }

    /// Channel holding the most energy; ties go to the lower channel id.
    pub fn dominant_entity(&self) -> Option<(EntityId, f64)> {
        let mut best: Option<(EntityId, f64)> = None;
        for (&entity, &value) in &self.energy {
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((entity, value)),
            }
        }
        best
    }

    pub fn is_energized(&self) -> bool {
        !self.energy.is_empty()
    }

    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }
}
