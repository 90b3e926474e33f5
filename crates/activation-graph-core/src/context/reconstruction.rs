//! Bounded spreading activation from an entry node.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::ReconstructionConfig;
use crate::dynamics::decayed_weight;
use crate::error::EngineResult;
use crate::graph::GraphStore;
use crate::types::{cosine_similarity, Embedding, EntityId, NodeId};

/// Limits of one reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconstructionParams {
    pub max_hops: usize,
    /// Activation placed on the entry node.
    pub energy_budget: f64,
    /// Fraction of a node's activation passed on per hop.
    pub spread_fraction: f64,
    /// Contributions below this are dropped.
    pub min_activation: f64,
    pub max_nodes: usize,
    /// Engine clock link weights are projected to.
    pub clock: f64,
    /// Structural decay rate used for the projection. Zero reads stored
    /// weights as they are.
    pub weight_decay: f64,
    pub resonance: f64,
    pub resonance_min: f64,
    pub resonance_max: f64,
}

impl ReconstructionParams {
    /// Multiplier on a link's weight under an affect cue: 1 without a cue or
    /// link affect, above 1 when they align, below 1 when they clash.
    pub fn resonance_gain(&self, cue: Option<&[f32]>, affect: Option<&Embedding>) -> f64 {
        match (cue, affect) {
            (Some(cue), Some(affect)) if self.resonance > 0.0 => {
                let r = cosine_similarity(cue, affect) as f64;
                (self.resonance * r).exp().clamp(self.resonance_min, self.resonance_max)
            }
            _ => 1.0,
        }
    }

    /// Read link weights as they stand at `clock` under `weight_decay`.
    #[must_use]
    pub fn at_clock(mut self, clock: f64, weight_decay: f64) -> Self {
        self.clock = clock;
        self.weight_decay = weight_decay;
        self
    }
}

impl From<&ReconstructionConfig> for ReconstructionParams {
    fn from(config: &ReconstructionConfig) -> Self {
        Self {
            max_hops: config.max_hops,
            energy_budget: config.energy_budget,
            spread_fraction: config.spread_fraction,
            min_activation: config.min_activation,
            max_nodes: config.max_nodes,
            clock: 0.0,
            weight_decay: 0.0,
            resonance: config.resonance,
            resonance_min: config.resonance_min,
            resonance_max: config.resonance_max,
        }
    }
}

/// An approximate prior activation pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedContext {
    pub entry: NodeId,
    pub entity: EntityId,
    /// Node activations, strongest first (ties by id).
    pub activations: Vec<(NodeId, f64)>,
    pub total_activation: f64,
    pub hops_used: usize,
    /// The node limit cut the pattern short.
    pub truncated: bool,
}

impl ReconstructedContext {
    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }

    pub fn activation(&self, id: NodeId) -> f64 {
        self.activations
            .iter()
            .find(|(n, _)| *n == id)
            .map_or(0.0, |(_, a)| *a)
    }

    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.activations.iter().map(|(n, _)| *n).collect()
    }

    /// Cosine similarity of the two activation vectors.
    pub fn cosine_similarity(&self, other: &Self) -> f64 {
        let a: BTreeMap<NodeId, f64> = self.activations.iter().copied().collect();
        let b: BTreeMap<NodeId, f64> = other.activations.iter().copied().collect();
        let dot: f64 = a.iter().filter_map(|(n, x)| b.get(n).map(|y| x * y)).sum();
        let na = a.values().map(|x| x * x).sum::<f64>().sqrt();
        let nb = b.values().map(|y| y * y).sum::<f64>().sqrt();
        if na * nb <= f64::EPSILON {
            return 0.0;
        }
        (dot / (na * nb)).clamp(-1.0, 1.0)
    }

    /// Jaccard overlap of the two node sets.
    pub fn jaccard(&self, other: &Self) -> f64 {
        let a = self.node_ids();
        let b = other.node_ids();
        let union = a.union(&b).count();
        if union == 0 {
            return 0.0;
        }
        a.intersection(&b).count() as f64 / union as f64
    }
}

/// Spread `energy_budget` from `entry` for up to `max_hops` hops.
///
/// Each hop passes `spread_fraction` of a node's wave activation along its
/// out-links, split by weight and normalized by `max(Σw, 1)` as diffusion
/// does. Weights are read decayed up to `params.clock`, so links that have
/// lain dormant count for what they are worth now. Reads the store only.
///
/// # Errors
/// - `NodeNotFound` if `entry` does not exist
pub fn reconstruct_context(
    store: &GraphStore,
    entry: NodeId,
    entity: EntityId,
    params: ReconstructionParams,
) -> EngineResult<ReconstructedContext> {
    reconstruct_with_affect(store, entry, entity, params, None)
}

/// [`reconstruct_context`] colored by an affect cue: link weights are scaled
/// by [`ReconstructionParams::resonance_gain`] before the split, so paths
/// whose affect matches the cue carry more of the pattern.
///
/// # Errors
/// - `NodeNotFound` if `entry` does not exist
pub fn reconstruct_with_affect(
    store: &GraphStore,
    entry: NodeId,
    entity: EntityId,
    params: ReconstructionParams,
    affect: Option<&[f32]>,
) -> EngineResult<ReconstructedContext> {
    store.node(entry)?;

    let mut activation: BTreeMap<NodeId, f64> = BTreeMap::new();
    activation.insert(entry, params.energy_budget);
    let mut wave: BTreeMap<NodeId, f64> = activation.clone();
    let mut hops_used = 0;
    let mut truncated = false;

    for hop in 1..=params.max_hops {
        let mut next: BTreeMap<NodeId, f64> = BTreeMap::new();
        for (node, a) in &wave {
            let out: Vec<(NodeId, f64)> = store
                .out_links(*node)
                .map(|l| {
                    let weight = decayed_weight(l, params.clock, params.weight_decay);
                    (l.target, weight * params.resonance_gain(affect, l.affect.as_ref()))
                })
                .collect();
            let total_weight: f64 = out.iter().map(|(_, w)| w).sum();
            if total_weight <= 0.0 {
                continue;
            }
            let norm = total_weight.max(1.0);
            for (target, weight) in out {
                let amount = a * params.spread_fraction * weight / norm;
                if amount >= params.min_activation && amount.is_finite() {
                    *next.entry(target).or_insert(0.0) += amount;
                }
            }
        }
        if next.is_empty() {
            break;
        }
        hops_used = hop;
        for (node, a) in &next {
            *activation.entry(*node).or_insert(0.0) += a;
        }
        if activation.len() > params.max_nodes {
            truncated = true;
            break;
        }
        wave = next;
    }

    let mut activations: Vec<(NodeId, f64)> = activation.into_iter().collect();
    activations.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    if activations.len() > params.max_nodes {
        activations.truncate(params.max_nodes);
        truncated = true;
    }

    Ok(ReconstructedContext {
        entry,
        entity,
        total_activation: activations.iter().map(|(_, a)| a).sum(),
        activations,
        hops_used,
        truncated,
    })
}
