//! Read-only engine state for callers outside the tick task.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::criticality::CriticalitySnapshot;
use crate::error::{EngineError, EngineResult};
use crate::goal::Goal;
use crate::persistence::DurabilityStatus;
use crate::scheduler::SchedulerState;
use crate::types::{EntityId, NodeId};
use crate::workspace::Workspace;

use super::metrics::EngineMetrics;

/// Consistent copy of the engine taken between ticks.
///
/// Only energized nodes are listed in `energies`; any other known node has
/// zero energy in every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineView {
    pub tick: u64,
    pub clock: f64,
    pub node_count: usize,
    pub link_count: usize,
    pub workspace: Workspace,
    pub criticality: CriticalitySnapshot,
    pub goal: Goal,
    pub energies: BTreeMap<NodeId, BTreeMap<EntityId, f64>>,
    pub energy_by_entity: BTreeMap<EntityId, f64>,
    pub metrics: EngineMetrics,
    pub durability: DurabilityStatus,
    pub scheduler_state: SchedulerState,
}

impl EngineView {
    /// # Errors
    /// - `NodeNotFound` for ids the graph never issued
    pub fn node_energy(&self, node: NodeId, entity: EntityId) -> EngineResult<f64> {
        if node.index() >= self.node_count {
            return Err(EngineError::NodeNotFound(node.to_string()));
        }
        Ok(self
            .energies
            .get(&node)
            .and_then(|channels| channels.get(&entity))
            .copied()
            .unwrap_or(0.0))
    }

    pub fn total_energy(&self) -> f64 {
        self.energy_by_entity.values().sum()
    }
}
