//! Budgeted, sticky workspace selection.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::WorkspaceConfig;
use crate::types::{weighted_centroid, ClusterId, Embedding, EntityId, NodeId};

use super::candidate::WorkspaceCandidate;

/// Whether an entry held its slot on the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    Incumbent,
    Challenger,
}

/// One selected cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub cluster_id: ClusterId,
    pub entity: EntityId,
    pub nodes: Vec<NodeId>,
    pub embedding: Option<Embedding>,
    pub energy: f64,
    pub coherence: f64,
    pub score: f64,
    /// Score after the incumbent bonus or challenger penalty.
    pub adjusted_score: f64,
    pub cost: f64,
    pub role: SlotRole,
    pub admitted_tick: u64,
}

/// The selected clusters, best `adjusted / cost` first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub entries: Vec<WorkspaceEntry>,
    pub capacity: f64,
    pub total_cost: f64,
    pub tick: u64,
}

impl Workspace {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        self.entries.iter().any(|e| e.cluster_id == id)
    }

    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.entries.iter().map(|e| e.cluster_id).collect()
    }

    /// Every member node of every selected cluster.
    pub fn node_ids(&self) -> HashSet<NodeId> {
        self.entries.iter().flat_map(|e| e.nodes.iter().copied()).collect()
    }

    /// Energy-weighted centroid of the selected clusters' embeddings.
    pub fn centroid(&self) -> Option<Embedding> {
        weighted_centroid(
            self.entries
                .iter()
                .filter_map(|e| e.embedding.as_deref().map(|v| (v, e.energy))),
        )
    }

    /// Mean coherence of the selected clusters, 0 when empty.
    pub fn mean_coherence(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.entries.iter().map(|e| e.coherence).sum::<f64>() / self.entries.len() as f64
    }
}

/// What one selection pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub admitted: Vec<ClusterId>,
    pub evicted: Vec<ClusterId>,
    /// Eligible clusters left out because the budget was used up.
    pub excluded_for_capacity: usize,
    /// Clusters whose adjusted score fell under the admission floor.
    pub below_admission: usize,
    /// Admissions and voluntary evictions were frozen by the dwell period.
    pub frozen: bool,
    /// Membership changed by choice (not only by clusters disappearing).
    pub voluntary_change: bool,
}

/// Owns the workspace between ticks.
#[derive(Debug, Clone)]
pub struct WorkspaceSelector {
    config: WorkspaceConfig,
    current: Workspace,
    last_change_tick: Option<u64>,
}

struct Ranked {
    candidate: WorkspaceCandidate,
    adjusted: f64,
    incumbent: bool,
}

impl Ranked {
    fn ratio(&self) -> f64 {
        self.adjusted / self.candidate.cost
    }
}

impl WorkspaceSelector {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            config,
            current: Workspace::default(),
            last_change_tick: None,
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn current(&self) -> &Workspace {
        &self.current
    }

    /// Select from scored candidates under `capacity`.
    ///
    /// Candidates whose adjusted score is under `admission_floor`, with fewer
    /// than two nodes, or costing more than the whole budget are ineligible;
    /// an ineligible incumbent is removed even while changes are frozen.
    pub fn select(
        &mut self,
        candidates: Vec<WorkspaceCandidate>,
        capacity: f64,
        admission_floor: f64,
        tick: u64,
    ) -> SelectionOutcome {
        let mut outcome = SelectionOutcome::default();
        let previous: HashMap<ClusterId, u64> = self
            .current
            .entries
            .iter()
            .map(|e| (e.cluster_id, e.admitted_tick))
            .collect();

        let mut ranked: Vec<Ranked> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.nodes.len() < 2
                || !(candidate.cost > 0.0)
                || candidate.cost > capacity
                || !candidate.score.is_finite()
            {
                continue;
            }
            let incumbent = previous.contains_key(&candidate.cluster_id);
            let adjusted = if incumbent {
                candidate.score * (1.0 + self.config.incumbent_bonus)
            } else {
                candidate.score * (1.0 - self.config.challenger_penalty)
            };
            if adjusted < admission_floor {
                outcome.below_admission += 1;
                continue;
            }
            ranked.push(Ranked {
                candidate,
                adjusted,
                incumbent,
            });
        }
        ranked.sort_by(|a, b| {
            b.ratio()
                .total_cmp(&a.ratio())
                .then(b.adjusted.total_cmp(&a.adjusted))
                .then(a.candidate.cluster_id.cmp(&b.candidate.cluster_id))
        });

        outcome.frozen = self
            .last_change_tick
            .map_or(false, |t| tick.saturating_sub(t) < self.config.min_dwell_ticks);

        let mut selected: Vec<Ranked> = Vec::new();
        let mut total = 0.0;
        let mut budget_drops: Vec<ClusterId> = Vec::new();
        for r in ranked {
            let allowed = !outcome.frozen || r.incumbent;
            if allowed && total + r.candidate.cost <= capacity {
                total += r.candidate.cost;
                selected.push(r);
            } else if allowed {
                outcome.excluded_for_capacity += 1;
                if r.incumbent {
                    budget_drops.push(r.candidate.cluster_id);
                }
            }
        }

        let kept: HashSet<ClusterId> = selected.iter().map(|r| r.candidate.cluster_id).collect();
        outcome.admitted = selected
            .iter()
            .filter(|r| !r.incumbent)
            .map(|r| r.candidate.cluster_id)
            .collect();
        let mut evicted: Vec<ClusterId> = previous
            .keys()
            .copied()
            .filter(|id| !kept.contains(id))
            .collect();
        evicted.sort_unstable();
        outcome.evicted = evicted;

        // Evictions forced while frozen (ineligibility, a shrunken budget) are
        // not voluntary, but every membership change restarts the dwell.
        outcome.voluntary_change = !outcome.admitted.is_empty()
            || (!outcome.frozen && !budget_drops.is_empty());
        if !outcome.admitted.is_empty() || !outcome.evicted.is_empty() {
            self.last_change_tick = Some(tick);
        }

        self.current = Workspace {
            entries: selected
                .into_iter()
                .map(|r| {
                    let admitted_tick = previous.get(&r.candidate.cluster_id).copied().unwrap_or(tick);
                    WorkspaceEntry {
                        cluster_id: r.candidate.cluster_id,
                        entity: r.candidate.entity,
                        nodes: r.candidate.nodes,
                        embedding: r.candidate.embedding,
                        energy: r.candidate.energy,
                        coherence: r.candidate.coherence,
                        score: r.candidate.score,
                        adjusted_score: r.adjusted,
                        cost: r.candidate.cost,
                        role: if r.incumbent {
                            SlotRole::Incumbent
                        } else {
                            SlotRole::Challenger
                        },
                        admitted_tick,
                    }
                })
                .collect(),
            capacity,
            total_cost: total,
            tick,
        };

        if !outcome.admitted.is_empty() || !outcome.evicted.is_empty() {
            info!(
                tick,
                admitted = outcome.admitted.len(),
                evicted = outcome.evicted.len(),
                cost = total,
                capacity,
                "Workspace membership changed"
            );
        }
        if outcome.excluded_for_capacity > 0 {
            debug!(tick, excluded = outcome.excluded_for_capacity, capacity, "Workspace at capacity");
        }
        outcome
    }

    /// Forget the current workspace (used after a snapshot load).
    pub fn reset(&mut self) {
        self.current = Workspace::default();
        self.last_change_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64, cost: f64, score: f64) -> WorkspaceCandidate {
        let nodes = (0..cost as u32).map(|i| NodeId(id as u32 * 100 + i)).collect();
        WorkspaceCandidate::with_score(ClusterId(id), nodes, cost, score)
    }

    /// Two clusters whose scores swap every tick, only one of which fits.
    fn alternating(config: WorkspaceConfig, ticks: u64) -> usize {
        let mut selector = WorkspaceSelector::new(config);
        let mut changes = 0;
        let mut last: Option<Vec<ClusterId>> = None;
        for tick in 0..ticks {
            let (a, b) = if tick % 2 == 0 { (1.05, 1.0) } else { (1.0, 1.05) };
            selector.select(vec![candidate(1, 2.0, a), candidate(2, 2.0, b)], 2.0, 0.0, tick);
            let ids = selector.current().cluster_ids();
            assert_eq!(ids.len(), 1);
            if last.as_ref().is_some_and(|l| *l != ids) {
                changes += 1;
            }
            last = Some(ids);
        }
        changes
    }

    #[test]
    fn test_baseline_thrashes() {
        let baseline = WorkspaceConfig {
            incumbent_bonus: 0.0,
            challenger_penalty: 0.0,
            min_dwell_ticks: 0,
            ..WorkspaceConfig::default()
        };
        assert_eq!(alternating(baseline, 20), 19);
    }

    #[test]
    fn test_hysteresis_holds_incumbent() {
        assert_eq!(alternating(WorkspaceConfig::default(), 20), 0);
    }

    #[test]
    fn test_dwell_alone_limits_change_rate() {
        let config = WorkspaceConfig {
            incumbent_bonus: 0.0,
            challenger_penalty: 0.0,
            min_dwell_ticks: 4,
            ..WorkspaceConfig::default()
        };
        let changes = alternating(config, 40);
        assert!(changes <= 40 / 4, "{} changes", changes);
    }

    #[test]
    fn test_budget_respected_greedily() {
        let mut selector = WorkspaceSelector::new(WorkspaceConfig::default());
        let out = selector.select(
            vec![
                candidate(1, 4.0, 2.0), // ratio 0.5
                candidate(2, 2.0, 1.8), // ratio 0.9
                candidate(3, 3.0, 1.5), // ratio 0.5
                candidate(4, 2.0, 0.2), // ratio 0.1
            ],
            6.0,
            0.0,
            0,
        );
        let ws = selector.current();
        assert!(ws.total_cost <= ws.capacity);
        assert_eq!(ws.cluster_ids(), vec![ClusterId(2), ClusterId(1)]);
        assert_eq!(out.excluded_for_capacity, 2);
        assert!(ws.entries.iter().all(|e| e.role == SlotRole::Challenger));
    }

    #[test]
    fn test_ineligible_incumbent_removed_while_frozen() {
        let mut selector = WorkspaceSelector::new(WorkspaceConfig::default());
        selector.select(vec![candidate(1, 2.0, 1.0), candidate(2, 2.0, 1.0)], 8.0, 0.0, 0);
        assert_eq!(selector.current().len(), 2);

        let out = selector.select(vec![candidate(1, 2.0, 1.0)], 8.0, 0.0, 1);
        assert!(out.frozen);
        assert_eq!(out.evicted, vec![ClusterId(2)]);
        assert!(!out.voluntary_change);
        assert_eq!(selector.current().entries[0].role, SlotRole::Incumbent);
    }

    #[test]
    fn test_shrinking_capacity_enforced_while_frozen() {
        let mut selector = WorkspaceSelector::new(WorkspaceConfig::default());
        selector.select(vec![candidate(1, 2.0, 1.0), candidate(2, 2.0, 0.9)], 8.0, 0.0, 0);
        selector.select(vec![candidate(1, 2.0, 1.0), candidate(2, 2.0, 0.9)], 2.0, 0.0, 1);
        let ws = selector.current();
        assert!(ws.total_cost <= 2.0);
        assert_eq!(ws.cluster_ids(), vec![ClusterId(1)]);
    }

    #[test]
    fn test_score_oscillating_at_floor_does_not_thrash() {
        let config = WorkspaceConfig::default();
        let dwell = config.min_dwell_ticks;
        let mut selector = WorkspaceSelector::new(config);
        let ticks = 30;
        let mut changes = 0;
        let mut was_in = false;

        // Admit clearly first, then hover around the floor.
        selector.select(vec![candidate(1, 2.0, 0.2)], 8.0, 0.05, 0);
        assert!(selector.current().contains(ClusterId(1)));
        for tick in 1..=ticks {
            let score = if tick % 2 == 0 { 0.051 } else { 0.049 };
            selector.select(vec![candidate(1, 2.0, score)], 8.0, 0.05, tick);
            let is_in = selector.current().contains(ClusterId(1));
            if is_in != was_in {
                changes += 1;
            }
            was_in = is_in;
        }
        assert!(changes <= (ticks / dwell) as usize, "{} changes", changes);
        assert!(selector.current().contains(ClusterId(1)));
    }

    #[test]
    fn test_challenger_near_floor_is_not_admitted() {
        let mut selector = WorkspaceSelector::new(WorkspaceConfig::default());
        for tick in 0..30 {
            let score = if tick % 2 == 0 { 0.051 } else { 0.049 };
            let out = selector.select(vec![candidate(1, 2.0, score)], 8.0, 0.05, tick);
            assert!(out.admitted.is_empty());
            assert_eq!(out.below_admission, 1);
        }
    }

    #[test]
    fn test_floor_eviction_restarts_dwell() {
        let mut selector = WorkspaceSelector::new(WorkspaceConfig::default());
        selector.select(vec![candidate(1, 2.0, 1.0)], 8.0, 0.05, 0);

        let out = selector.select(vec![candidate(1, 2.0, 0.01)], 8.0, 0.05, 5);
        assert_eq!(out.evicted, vec![ClusterId(1)]);

        let out = selector.select(vec![candidate(1, 2.0, 1.0)], 8.0, 0.05, 6);
        assert!(out.frozen);
        assert!(selector.current().is_empty());

        let out = selector.select(vec![candidate(1, 2.0, 1.0)], 8.0, 0.05, 8);
        assert!(!out.frozen);
        assert_eq!(out.admitted, vec![ClusterId(1)]);
    }

    #[test]
    fn test_admission_floor_and_solo_rejection() {
        let mut selector = WorkspaceSelector::new(WorkspaceConfig::default());
        let out = selector.select(
            vec![candidate(1, 2.0, 0.01), candidate(2, 1.0, 5.0)],
            8.0,
            0.05,
            0,
        );
        assert_eq!(out.below_admission, 1);
        assert!(selector.current().is_empty());
    }
}
