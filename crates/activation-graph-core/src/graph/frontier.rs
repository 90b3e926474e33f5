//! Active frontier: the small part of the graph a tick looks at.

use std::collections::{BTreeSet, HashSet};

use crate::types::{EntityId, NodeId};

use super::GraphStore;

/// Nodes with any channel above the activity floor, plus their one-hop
/// neighborhood. Built from the store's energized set, never from a full
/// arena scan.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    floor: f64,
    active: Vec<NodeId>,
    active_set: HashSet<NodeId>,
    members: Vec<NodeId>,
    member_set: HashSet<NodeId>,
}

impl Frontier {
    pub fn collect(store: &GraphStore, floor: f64) -> Self {
        let active: Vec<NodeId> = store
            .energized()
            .filter(|id| {
                store
                    .node(*id)
                    .map(|n| n.peak_energy() > floor)
                    .unwrap_or(false)
            })
            .collect();

        let mut members: BTreeSet<NodeId> = active.iter().copied().collect();
        for id in &active {
            members.extend(store.neighbors(*id));
        }

        Self {
            floor,
            active_set: active.iter().copied().collect(),
            active,
            member_set: members.iter().copied().collect(),
            members: members.into_iter().collect(),
        }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Active nodes in id order.
    pub fn active(&self) -> &[NodeId] {
        &self.active
    }

    /// Active nodes whose energy in `entity` exceeds the floor.
    pub fn active_in(&self, store: &GraphStore, entity: EntityId) -> Vec<NodeId> {
        self.active
            .iter()
            .copied()
            .filter(|id| {
                store
                    .node(*id)
                    .map(|n| n.energy(entity) > self.floor)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Active nodes plus neighbors, in id order.
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.active_set.contains(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.member_set.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
