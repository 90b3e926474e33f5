//! Cumulative engine counters.

use serde::{Deserialize, Serialize};

use super::report::TickReport;
use super::stability::StabilityCounts;

/// Counters since the engine was created (or its graph last loaded).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineMetrics {
    pub ticks: u64,
    pub stimuli_applied: u64,
    /// Folded into another stimulus by debouncing.
    pub stimuli_coalesced: u64,
    /// Refused at the queue: validation failure or `Busy`.
    pub stimuli_rejected: u64,
    /// Dequeued after their deadline and dropped.
    pub stimuli_expired: u64,
    pub nodes_created: u64,
    pub links_created_explicit: u64,
    pub links_created_coactivation: u64,
    pub links_created_semantic: u64,
    pub links_graduated: u64,
    pub links_pruned: u64,
    pub links_removed: u64,
    pub stability: StabilityCounts,
    pub clusters_emerged: u64,
    pub clusters_dissolved: u64,
    pub goal_switches: u64,
    pub deadlock_avoided: u64,
    /// Eligible clusters left out of the workspace by the budget.
    pub capacity_exclusions: u64,
    pub workspace_changes: u64,
    pub snapshots_saved: u64,
    pub snapshots_loaded: u64,
}

impl EngineMetrics {
    /// Fold one tick into the counters.
    pub fn record_tick(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.links_created_coactivation += report.topology.created_coactivation as u64;
        self.links_created_semantic += report.topology.created_semantic as u64;
        self.links_graduated += report.topology.graduated as u64;
        self.links_pruned += report.topology.pruned as u64;
        self.stability.negative_energy += report.stability.negative_energy;
        self.stability.non_finite += report.stability.non_finite;
        self.stability.weight_ceiling += report.stability.weight_ceiling;
        self.clusters_emerged += report.emerged.len() as u64;
        self.clusters_dissolved += report.dissolved.len() as u64;
        if report.goal.switched {
            self.goal_switches += 1;
        }
        if report.goal.deadlock_avoided_event {
            self.deadlock_avoided += 1;
        }
        self.capacity_exclusions += report.workspace.excluded_for_capacity as u64;
        if !report.workspace.admitted.is_empty() || !report.workspace.evicted.is_empty() {
            self.workspace_changes += 1;
        }
    }

    pub fn links_created(&self) -> u64 {
        self.links_created_explicit + self.links_created_coactivation + self.links_created_semantic
    }
}
