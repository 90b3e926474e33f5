//! Periodic link creation and probation-based pruning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TopologyConfig;
use crate::dynamics::decay_links;
use crate::error::EngineResult;
use crate::graph::{Frontier, GraphStore, NewLink};
use crate::types::{cosine_similarity, CreationReason, Embedding, LinkId, LinkType, NodeId};

use super::coactivation::CoactivationTracker;
use super::sources::{fuse_link_score, LinkProposal, LinkSource, SourceWeights};

/// A caller-requested link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplicitLink {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub link_type: LinkType,
    /// Defaults to the configured explicit weight.
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub affect: Option<Embedding>,
}

fn full_confidence() -> f64 {
    1.0
}

impl ExplicitLink {
    pub fn new(source: NodeId, target: NodeId, link_type: LinkType) -> Self {
        Self {
            source,
            target,
            link_type,
            weight: None,
            confidence: 1.0,
            affect: None,
        }
    }
}

/// What one topology step changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyOutcome {
    pub created: Vec<LinkId>,
    pub created_coactivation: usize,
    pub created_semantic: usize,
    pub graduated: usize,
    pub pruned: usize,
    /// Qualifying proposals left for a later pass by the per-tick budget.
    pub deferred_budget: usize,
    /// Qualifying proposals refused by the new-outdegree cap.
    pub deferred_outdegree: usize,
}

/// Owns the coactivation windows and applies the creation/pruning schedule.
#[derive(Debug, Clone)]
pub struct TopologyEvolver {
    config: TopologyConfig,
    weights: SourceWeights,
    tracker: CoactivationTracker,
}

impl TopologyEvolver {
    pub fn new(config: TopologyConfig) -> Self {
        Self {
            weights: SourceWeights::from(&config),
            tracker: CoactivationTracker::new(config.coactivation_window),
            config,
        }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn tracker(&self) -> &CoactivationTracker {
        &self.tracker
    }

    /// Run one tick of structural learning.
    ///
    /// `clock` is the engine clock after this tick's integration step and
    /// `weight_decay` the structural decay rate, used by the pruning sweep.
    pub fn step(
        &mut self,
        store: &mut GraphStore,
        frontier: &Frontier,
        tick: u64,
        clock: f64,
        weight_decay: f64,
    ) -> TopologyOutcome {
        let mut outcome = TopologyOutcome::default();
        if !self.config.enabled {
            return outcome;
        }

        self.tracker.record(store, frontier);
        self.graduate_active(store, frontier, &mut outcome);

        let mut proposals: HashMap<(NodeId, NodeId), LinkProposal> = HashMap::new();
        if tick % self.config.coactivation_every_ticks == 0 {
            for (a, b, r) in self.tracker.correlated_pairs(
                store,
                self.config.coactivation_top_k,
                self.config.min_samples,
                self.config.min_correlation,
            ) {
                propose(&mut proposals, a, b, LinkSource::Coactivation { correlation: r });
            }
        }
        if tick % self.config.semantic_every_ticks == 0 {
            for (a, b, s) in self.similar_pairs(store, frontier) {
                propose(&mut proposals, a, b, LinkSource::Semantic { similarity: s });
            }
        }
        if !proposals.is_empty() {
            self.create(store, proposals, tick, clock, &mut outcome);
        }

        if tick % self.config.prune_every_ticks == 0 {
            self.prune(store, tick, clock, weight_decay, &mut outcome);
        }

        if !outcome.created.is_empty() || outcome.pruned > 0 {
            info!(
                tick,
                created = outcome.created.len(),
                coactivation = outcome.created_coactivation,
                semantic = outcome.created_semantic,
                pruned = outcome.pruned,
                "Topology changed"
            );
        }
        outcome
    }

    /// Create a caller-requested link immediately, graduated and at full
    /// strength, whatever the automatic sources think of the pair.
    ///
    /// # Errors
    /// Any store validation error (`NodeNotFound`, `DuplicateLink`, ...).
    pub fn create_explicit(
        &self,
        store: &mut GraphStore,
        request: ExplicitLink,
        tick: u64,
        clock: f64,
    ) -> EngineResult<LinkId> {
        let id = store.add_link(NewLink {
            source: request.source,
            target: request.target,
            link_type: request.link_type,
            weight: request.weight.unwrap_or(self.config.explicit_weight),
            affect: request.affect,
            creation_reason: CreationReason::Explicit,
            confidence: request.confidence,
            created_tick: tick,
            graduated: true,
            clock,
        })?;
        info!(
            link = %id,
            source = %request.source,
            target = %request.target,
            link_type = %request.link_type,
            "Explicit link created"
        );
        Ok(id)
    }

    pub fn reset(&mut self) {
        self.tracker.clear();
    }

    fn graduate_active(&self, store: &mut GraphStore, frontier: &Frontier, outcome: &mut TopologyOutcome) {
        let ids: Vec<LinkId> = frontier
            .active()
            .iter()
            .flat_map(|id| store.outgoing(*id).iter().copied())
            .collect();
        for id in ids {
            if let Ok(link) = store.link_mut(id) {
                if !link.graduated && link.weight > self.config.graduation_weight {
                    link.graduated = true;
                    outcome.graduated += 1;
                }
            }
        }
    }

    fn similar_pairs(&self, store: &GraphStore, frontier: &Frontier) -> Vec<(NodeId, NodeId, f64)> {
        let mut ranked: Vec<(NodeId, f64)> = frontier
            .active()
            .iter()
            .filter_map(|id| store.node(*id).ok())
            .filter(|n| n.has_embedding())
            .map(|n| (n.id, n.total_energy()))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(self.config.coactivation_top_k);

        let mut pairs = Vec::new();
        for (i, (a, _)) in ranked.iter().enumerate() {
            for (b, _) in &ranked[i + 1..] {
                if store.are_linked(*a, *b) {
                    continue;
                }
                let (Ok(na), Ok(nb)) = (store.node(*a), store.node(*b)) else {
                    continue;
                };
                let sim = cosine_similarity(&na.embedding, &nb.embedding) as f64;
                if sim >= self.config.semantic_threshold {
                    pairs.push((*a, *b, sim));
                }
            }
        }
        pairs
    }

    fn create(
        &self,
        store: &mut GraphStore,
        proposals: HashMap<(NodeId, NodeId), LinkProposal>,
        tick: u64,
        clock: f64,
        outcome: &mut TopologyOutcome,
    ) {
        let mut ranked: Vec<LinkProposal> = proposals
            .into_values()
            .map(|mut p| {
                p.score = fuse_link_score(&p.evidence, &self.weights);
                p
            })
            .filter(|p| p.score >= self.config.creation_threshold)
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.source.cmp(&b.source))
                .then(a.target.cmp(&b.target))
        });

        for proposal in ranked {
            if outcome.created.len() >= self.config.per_tick_budget {
                outcome.deferred_budget += 1;
                continue;
            }
            let probationary_out = store
                .out_links(proposal.source)
                .filter(|l| l.is_probationary())
                .count();
            if probationary_out >= self.config.max_new_outdegree {
                outcome.deferred_outdegree += 1;
                continue;
            }

            let reason = proposal.reason();
            let result = store.add_link(NewLink {
                source: proposal.source,
                target: proposal.target,
                link_type: proposal.link_type(),
                weight: self.config.initial_weight,
                affect: None,
                creation_reason: reason,
                confidence: proposal.confidence(),
                created_tick: tick,
                graduated: false,
                clock,
            });
            match result {
                Ok(id) => {
                    debug!(
                        tick,
                        link = %id,
                        source = %proposal.source,
                        target = %proposal.target,
                        score = proposal.score,
                        %reason,
                        "Probationary link created"
                    );
                    match reason {
                        CreationReason::Semantic => outcome.created_semantic += 1,
                        _ => outcome.created_coactivation += 1,
                    }
                    outcome.created.push(id);
                }
                Err(e) => debug!(tick, error = %e, "Skipped link proposal"),
            }
        }
    }

    fn prune(
        &self,
        store: &mut GraphStore,
        tick: u64,
        clock: f64,
        weight_decay: f64,
        outcome: &mut TopologyOutcome,
    ) {
        let ids = store.link_ids();
        decay_links(store, ids.iter().copied(), clock, weight_decay);

        for id in ids {
            let Ok(link) = store.link_mut(id) else {
                continue;
            };
            let expired = if link.graduated {
                link.weight < self.config.prune_epsilon
            } else if link.weight > self.config.graduation_weight {
                link.graduated = true;
                outcome.graduated += 1;
                false
            } else {
                tick.saturating_sub(link.probation_start_tick) >= self.config.probation_ticks
            };
            if expired && store.remove_link(id).is_ok() {
                outcome.pruned += 1;
            }
        }
    }
}

/// Add evidence for the unordered pair `{a, b}`. The first proposer fixes the
/// direction `a → b`.
fn propose(
    proposals: &mut HashMap<(NodeId, NodeId), LinkProposal>,
    a: NodeId,
    b: NodeId,
    source: LinkSource,
) {
    let key = if a < b { (a, b) } else { (b, a) };
    proposals
        .entry(key)
        .or_insert_with(|| LinkProposal {
            source: a,
            target: b,
            evidence: Vec::new(),
            score: 0.0,
        })
        .evidence
        .push(source);
}
