//! Conservative multi-channel diffusion with state decay.
//!
//! For a node with energy `E` in channel `e`, out-link weights `w_i` and
//! `W = Σ w_i`, the amount sent along link `i` over a step of length `dt` is
//!
//! ```text
//! a      = 1 - (1 - α_e)^dt
//! send_i = E · a · w_i / max(W, 1)
//! ```
//!
//! Normalizing by `max(W, 1)` keeps each row sub-stochastic, and the sender
//! keeps `E - Σ send_i`, so transfer alone conserves the channel total.
//! State decay `(1 - δ_e)^dt` is applied afterwards.
//!
//! Source plans are computed in parallel from the store as it was at the
//! start of the pass; the reduction into the post-tick buffer runs in node
//! order so the result is identical to a sequential pass.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::graph::GraphStore;
use crate::types::{EntityId, LinkId, NodeId};

/// Diffusion fraction and state decay rate for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRates {
    pub alpha: f64,
    pub state_decay: f64,
}

impl ChannelRates {
    pub fn new(alpha: f64, state_decay: f64) -> Self {
        Self { alpha, state_decay }
    }
}

/// Rates in force for a tick: a global pair plus per-channel overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    global: ChannelRates,
    per_entity: BTreeMap<EntityId, ChannelRates>,
}

impl RateTable {
    pub fn new(global: ChannelRates) -> Self {
        Self {
            global,
            per_entity: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_entity(mut self, entity: EntityId, rates: ChannelRates) -> Self {
        self.per_entity.insert(entity, rates);
        self
    }

    pub fn set_entity(&mut self, entity: EntityId, rates: ChannelRates) {
        self.per_entity.insert(entity, rates);
    }

    pub fn global(&self) -> ChannelRates {
        self.global
    }

    pub fn for_entity(&self, entity: EntityId) -> ChannelRates {
        self.per_entity.get(&entity).copied().unwrap_or(self.global)
    }
}

/// Step parameters.
#[derive(Debug, Clone, Copy)]
pub struct DiffusionParams {
    pub dt: f64,
    pub energy_epsilon: f64,
    pub traversal_epsilon: f64,
}

/// Energy moved along one link in one channel during a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Traversal {
    pub link: LinkId,
    pub source: NodeId,
    pub target: NodeId,
    pub entity: EntityId,
    pub amount: f64,
}

/// Post-tick buffer and bookkeeping. Nothing has been written to the store.
#[derive(Debug, Clone, Default)]
pub struct DiffusionOutcome {
    /// New energy maps for every node touched by the pass, in id order.
    /// An empty map means the node lost all its energy.
    pub energies: Vec<(NodeId, BTreeMap<EntityId, f64>)>,
    pub traversals: Vec<Traversal>,
    pub transferred: f64,
    /// Negative results clamped to zero.
    pub negative_clamps: usize,
    /// Non-finite values dropped.
    pub non_finite: usize,
}

/// Fraction of energy moved over a step of length `dt` at per-unit rate `rate`.
#[inline]
pub fn effective_fraction(rate: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - rate.clamp(0.0, 1.0)).powf(dt)
}

#[derive(Debug, Default)]
struct SourcePlan {
    source: NodeId,
    retained: Vec<(EntityId, f64)>,
    sends: Vec<(LinkId, NodeId, EntityId, f64)>,
    non_finite: usize,
}

fn plan_source(store: &GraphStore, source: NodeId, rates: &RateTable, dt: f64) -> SourcePlan {
    let mut plan = SourcePlan {
        source,
        ..SourcePlan::default()
    };
    let Ok(node) = store.node(source) else {
        return plan;
    };

    let out: Vec<(LinkId, NodeId, f64)> = store
        .out_links(source)
        .filter(|l| l.weight > 0.0 && l.weight.is_finite())
        .map(|l| (l.id, l.target, l.weight))
        .collect();
    let total_weight: f64 = out.iter().map(|(_, _, w)| w).sum();
    let norm = total_weight.max(1.0);

    for (&entity, &energy) in node.energies() {
        if !energy.is_finite() {
            plan.non_finite += 1;
            continue;
        }
        if energy <= 0.0 {
            continue;
        }
        let fraction = if out.is_empty() {
            0.0
        } else {
            effective_fraction(rates.for_entity(entity).alpha, dt)
        };

        let mut sent = 0.0;
        for (link, target, weight) in &out {
            let amount = energy * fraction * (weight / norm);
            if amount > 0.0 {
                plan.sends.push((*link, *target, entity, amount));
                sent += amount;
            }
        }
        plan.retained.push((entity, energy - sent));
    }
    plan
}

/// Run one diffusion + state-decay pass over every energized node.
pub fn diffuse(store: &GraphStore, rates: &RateTable, params: &DiffusionParams) -> DiffusionOutcome {
    let sources: Vec<NodeId> = store.energized().collect();
    let plans: Vec<SourcePlan> = sources
        .par_iter()
        .map(|source| plan_source(store, *source, rates, params.dt))
        .collect();

    let mut outcome = DiffusionOutcome::default();
    let mut next: BTreeMap<NodeId, BTreeMap<EntityId, f64>> =
        sources.iter().map(|s| (*s, BTreeMap::new())).collect();

    for plan in plans {
        outcome.non_finite += plan.non_finite;
        let own = next.entry(plan.source).or_default();
        for (entity, value) in plan.retained {
            *own.entry(entity).or_insert(0.0) += value;
        }
        for (link, target, entity, amount) in plan.sends {
            *next
                .entry(target)
                .or_default()
                .entry(entity)
                .or_insert(0.0) += amount;
            outcome.transferred += amount;
            if amount >= params.traversal_epsilon {
                outcome.traversals.push(Traversal {
                    link,
                    source: plan.source,
                    target,
                    entity,
                    amount,
                });
            }
        }
    }

    for map in next.values_mut() {
        map.retain(|entity, value| {
            let decay = rates.for_entity(*entity).state_decay;
            let decayed = *value * super::decay_factor(decay, params.dt);
            if !decayed.is_finite() {
                outcome.non_finite += 1;
                return false;
            }
            if decayed < 0.0 {
                outcome.negative_clamps += 1;
                return false;
            }
            *value = decayed;
            decayed >= params.energy_epsilon && decayed > 0.0
        });
    }

    outcome.energies = next.into_iter().collect();
    outcome
}
