//! Exponential decay, applied lazily to link weights.
//!
//! Each link records the engine clock up to which decay has been applied.
//! Bringing a link up to date multiplies its weight by `(1 - δ_w)^Δt`, which
//! composes exactly, so touching a link every tick or once every thousand
//! ticks yields the same weight.

use crate::graph::GraphStore;
use crate::types::{Link, LinkId};

/// Retained fraction after `dt` steps at per-step loss `rate`.
#[inline]
pub fn decay_factor(rate: f64, dt: f64) -> f64 {
    if dt <= 0.0 || rate <= 0.0 {
        return 1.0;
    }
    (1.0 - rate.min(1.0)).powf(dt)
}

/// Weight `link` would have at `clock`, without touching it.
#[inline]
pub fn decayed_weight(link: &Link, clock: f64, rate: f64) -> f64 {
    link.weight * decay_factor(rate, clock - link.decay_clock)
}

/// Bring one link's weight up to `clock`. Returns the new weight.
pub fn decay_link_weight(link: &mut Link, clock: f64, rate: f64) -> f64 {
    let elapsed = clock - link.decay_clock;
    if elapsed > 0.0 {
        link.weight *= decay_factor(rate, elapsed);
        link.decay_clock = clock;
    }
    link.weight
}

/// Bring a set of links up to `clock`. Stale ids are skipped.
pub fn decay_links<I>(store: &mut GraphStore, ids: I, clock: f64, rate: f64) -> usize
where
    I: IntoIterator<Item = LinkId>,
{
    let mut touched = 0;
    for id in ids {
        if let Ok(link) = store.link_mut(id) {
            decay_link_weight(link, clock, rate);
            touched += 1;
        }
    }
    touched
}

/// Out-links of every energized node: the links diffusion may use this tick.
pub fn energized_out_links(store: &GraphStore) -> Vec<LinkId> {
    store
        .energized()
        .flat_map(|id| store.outgoing(id).iter().copied())
        .collect()
}

/// In- and out-links of every energized node, deduplicated: the links the
/// frontier, the spectral estimate and cluster measurement read.
pub fn energized_links(store: &GraphStore) -> Vec<LinkId> {
    let mut ids: Vec<LinkId> = store
        .energized()
        .flat_map(|id| store.outgoing(id).iter().chain(store.incoming(id)).copied())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
