//! Per-tick report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::criticality::CriticalitySnapshot;
use crate::dynamics::ChannelRates;
use crate::goal::GoalSource;
use crate::scheduler::SchedulerState;
use crate::topology::TopologyOutcome;
use crate::types::{ClusterId, EntityId};

use super::stability::StabilityCounts;

/// Goal evaluation for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalReport {
    pub source: GoalSource,
    pub switched: bool,
    /// The stack fell through to the default goal.
    pub on_default: bool,
    /// This tick is the one that fell through (counted once per episode).
    pub deadlock_avoided_event: bool,
}

/// Workspace after selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceReport {
    pub clusters: Vec<ClusterId>,
    pub node_count: usize,
    pub total_cost: f64,
    pub capacity: f64,
    pub admission_floor: f64,
    pub admitted: Vec<ClusterId>,
    pub evicted: Vec<ClusterId>,
    pub excluded_for_capacity: usize,
    pub below_admission: usize,
    pub frozen: bool,
}

/// Everything observable about one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub dt: f64,
    pub clock: f64,
    /// Active nodes after the pass.
    pub frontier_size: usize,
    pub energy_by_entity: BTreeMap<EntityId, f64>,
    pub total_energy: f64,
    /// Energy moved along links during diffusion.
    pub transferred: f64,
    /// Rates the diffusion pass ran with.
    pub rates_used: ChannelRates,
    /// Controller state after this tick's update; holds the rates for the next pass.
    pub criticality: CriticalitySnapshot,
    pub links_strengthened: usize,
    pub topology: TopologyOutcome,
    pub stability: StabilityCounts,
    pub emerged: Vec<ClusterId>,
    pub dissolved: Vec<ClusterId>,
    pub emergence_threshold: f64,
    pub clusters_tracked: usize,
    pub workspace: WorkspaceReport,
    pub goal: GoalReport,
    /// Filled in by the scheduler; absent for direct `Engine::tick` calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_state: Option<SchedulerState>,
}

impl TickReport {
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
