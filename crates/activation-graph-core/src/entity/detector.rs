//! Hysteresis and identity tracking on top of the per-tick candidates.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EmergenceConfig;
use crate::graph::{Frontier, GraphStore};
use crate::types::ClusterId;

use super::cluster::{find_candidates, jaccard, CandidateCluster, ClusterLifecycle, EntityCluster};
use super::threshold::{EmergenceThreshold, ThresholdReading};

/// Result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    /// Every candidate this tick, emerged or not, by descending score.
    pub clusters: Vec<EntityCluster>,
    /// Clusters that crossed the entry threshold this tick.
    pub emerged: Vec<ClusterId>,
    /// Clusters that stopped being emerged this tick.
    pub dissolved: Vec<EntityCluster>,
    pub threshold: f64,
    pub raw_threshold: f64,
    /// Emerged clusters turned away by the entity cap.
    pub capped: usize,
}

impl DetectionOutcome {
    /// Clusters currently emerged (emerging or active).
    pub fn emerged_clusters(&self) -> impl Iterator<Item = &EntityCluster> {
        self.clusters.iter().filter(|c| c.lifecycle.is_emerged())
    }
}

/// Detects emerged clusters each tick.
///
/// The only state kept between ticks is what hysteresis needs: the previous
/// tick's tracked clusters (for identity and lifecycle) and the threshold
/// EMA. Clusters themselves are recomputed from the graph every time.
#[derive(Debug, Clone)]
pub struct EntityDetector {
    config: EmergenceConfig,
    threshold: EmergenceThreshold,
    tracked: Vec<EntityCluster>,
    next_id: u64,
}

impl EntityDetector {
    pub fn new(config: EmergenceConfig) -> Self {
        Self {
            threshold: EmergenceThreshold::new(
                config.score_floor,
                config.threshold_ema_beta,
                config.min_population_for_relative,
            ),
            config,
            tracked: Vec::new(),
            next_id: 1,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold.current()
    }

    /// Clusters tracked after the last pass.
    pub fn tracked(&self) -> &[EntityCluster] {
        &self.tracked
    }

    pub fn detect(&mut self, store: &GraphStore, frontier: &Frontier, tick: u64) -> DetectionOutcome {
        let candidates = find_candidates(store, frontier);
        let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
        let reading = self.threshold.observe(&scores);
        self.classify(candidates, reading, tick)
    }

    /// Apply identity matching, hysteresis and the entity cap.
    pub fn classify(
        &mut self,
        candidates: Vec<CandidateCluster>,
        reading: ThresholdReading,
        tick: u64,
    ) -> DetectionOutcome {
        let tau = reading.effective;
        let enter = self.config.enter_margin * tau;
        let exit = self.config.exit_margin * tau;

        let mut previous: Vec<Option<EntityCluster>> =
            std::mem::take(&mut self.tracked).into_iter().map(Some).collect();
        let mut clusters = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let matched = best_match(&previous, &candidate, self.config.identity_overlap)
                .and_then(|i| previous[i].take());
            let (id, was, first_seen, emerged_tick) = match matched {
                Some(prev) => (prev.id, prev.lifecycle, prev.first_seen_tick, prev.emerged_tick),
                None => {
                    let id = ClusterId(self.next_id);
                    self.next_id += 1;
                    (id, ClusterLifecycle::Dormant, tick, None)
                }
            };

            let energized = candidate.energy >= self.config.min_cluster_energy;
            let lifecycle = if was.is_emerged() {
                if energized && candidate.score >= exit {
                    ClusterLifecycle::Active
                } else {
                    ClusterLifecycle::Dissolving
                }
            } else if energized && candidate.score > enter {
                ClusterLifecycle::Emerging
            } else {
                ClusterLifecycle::Dormant
            };

            clusters.push(EntityCluster {
                id,
                entity: candidate.entity,
                cost: candidate.nodes.len() as f64 * self.config.cost_per_node,
                nodes: candidate.nodes,
                energy: candidate.energy,
                coherence: candidate.coherence,
                score: candidate.score,
                lifecycle,
                embedding: candidate.embedding,
                first_seen_tick: first_seen,
                emerged_tick: if lifecycle == ClusterLifecycle::Emerging {
                    Some(tick)
                } else {
                    emerged_tick
                },
            });
        }

        clusters.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        let capped = self.apply_cap(&mut clusters);

        let mut outcome = DetectionOutcome {
            threshold: tau,
            raw_threshold: reading.raw,
            capped,
            ..DetectionOutcome::default()
        };

        // Previously emerged clusters whose component vanished.
        for prev in previous.into_iter().flatten() {
            if prev.lifecycle.is_emerged() {
                outcome.dissolved.push(EntityCluster {
                    lifecycle: ClusterLifecycle::Dissolving,
                    ..prev
                });
            }
        }
        for cluster in &clusters {
            match cluster.lifecycle {
                ClusterLifecycle::Emerging => outcome.emerged.push(cluster.id),
                ClusterLifecycle::Dissolving => outcome.dissolved.push(cluster.clone()),
                _ => {}
            }
        }

        for id in &outcome.emerged {
            info!(tick, cluster = %id, threshold = tau, "Entity cluster emerged");
        }
        for cluster in &outcome.dissolved {
            info!(tick, cluster = %cluster.id, score = cluster.score, "Entity cluster dissolved");
        }
        debug!(
            tick,
            candidates = clusters.len(),
            threshold = tau,
            raw = reading.raw,
            "Cluster detection complete"
        );

        // A dissolving cluster whose component is still there keeps its id.
        self.tracked = clusters
            .iter()
            .map(|c| match c.lifecycle {
                ClusterLifecycle::Dissolving => EntityCluster {
                    lifecycle: ClusterLifecycle::Dormant,
                    emerged_tick: None,
                    ..c.clone()
                },
                _ => c.clone(),
            })
            .collect();
        outcome.clusters = clusters;
        outcome
    }

    /// Keep at most `max_entities` emerged clusters (highest score first).
    ///
    /// Equivalent to raising τ to the score at the cap-th rank.
    fn apply_cap(&self, clusters: &mut [EntityCluster]) -> usize {
        let mut kept = 0;
        let mut capped = 0;
        for cluster in clusters.iter_mut() {
            if !cluster.lifecycle.is_emerged() {
                continue;
            }
            if kept < self.config.max_entities {
                kept += 1;
                continue;
            }
            capped += 1;
            cluster.lifecycle = match cluster.lifecycle {
                ClusterLifecycle::Active => ClusterLifecycle::Dissolving,
                _ => ClusterLifecycle::Dormant,
            };
            if cluster.lifecycle == ClusterLifecycle::Dormant {
                cluster.emerged_tick = None;
            }
        }
        capped
    }

    pub fn reset(&mut self) {
        self.tracked.clear();
        self.threshold.reset();
    }
}

fn best_match(
    previous: &[Option<EntityCluster>],
    candidate: &CandidateCluster,
    min_overlap: f64,
) -> Option<usize> {
    previous
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
        .filter(|(_, p)| p.entity == candidate.entity)
        .map(|(i, p)| (i, jaccard(&p.nodes, &candidate.nodes)))
        .filter(|(_, overlap)| *overlap >= min_overlap)
        .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(i, _)| i)
}
