//! Bounded Hebbian reinforcement.
//!
//! ```text
//! gain = min(η · transferred, max_step) · (w_max - w)
//! ```
//!
//! With `max_step < 1` the new weight is `w_max - (1 - f)(w_max - w)`, which is
//! strictly below `w_max` in exact arithmetic. A floating-point result that
//! still lands on the ceiling is pulled back and counted as a stability
//! violation.

use std::collections::{BTreeMap, HashSet};

use crate::config::LearningConfig;
use crate::graph::GraphStore;
use crate::types::{LinkId, NodeId};

use super::Traversal;

/// Headroom-scaled weight increment.
#[inline]
pub fn hebbian_gain(weight: f64, w_max: f64, eta: f64, transferred: f64, max_step: f64) -> f64 {
    let step = (eta * transferred).min(max_step);
    if !(step > 0.0) {
        return 0.0;
    }
    step * (w_max - weight).max(0.0)
}

/// Apply a gain, keeping the result strictly below `w_max`.
///
/// Returns the new weight and whether the ceiling guard fired.
#[inline]
pub fn reinforce(weight: f64, gain: f64, w_max: f64) -> (f64, bool) {
    let next = weight + gain;
    if next.is_finite() && next < w_max {
        return (next, false);
    }
    let ceiling = w_max * (1.0 - f64::EPSILON);
    (ceiling.max(weight.min(ceiling)), true)
}

/// Summary of one learning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LearningOutcome {
    pub strengthened: usize,
    pub total_gain: f64,
    pub ceiling_clamps: usize,
}

/// Strengthen every traversed link.
///
/// Traversals of the same link in several channels are summed first so each
/// link gets a single update per tick. A traversal is workspace-level when its
/// source node belongs to a cluster currently in the workspace.
pub fn apply_traversals(
    store: &mut GraphStore,
    traversals: &[Traversal],
    workspace_nodes: &HashSet<NodeId>,
    config: &LearningConfig,
    tick: u64,
) -> LearningOutcome {
    let mut per_link: BTreeMap<LinkId, (NodeId, f64)> = BTreeMap::new();
    for t in traversals {
        per_link.entry(t.link).or_insert((t.source, 0.0)).1 += t.amount;
    }

    let w_max = store.w_max();
    let mut outcome = LearningOutcome::default();

    for (id, (source, transferred)) in per_link {
        let Ok(link) = store.link_mut(id) else {
            continue;
        };
        link.last_traversed_tick = Some(tick);
        if !config.enabled {
            continue;
        }

        let eta = config.learning_rate(workspace_nodes.contains(&source));
        let gain = hebbian_gain(link.weight, w_max, eta, transferred, config.max_step);
        if gain <= 0.0 {
            continue;
        }
        let (next, clamped) = reinforce(link.weight, gain, w_max);
        outcome.total_gain += next - link.weight;
        link.weight = next;
        outcome.strengthened += 1;
        if clamped {
            outcome.ceiling_clamps += 1;
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_scales_with_headroom() {
        let g_low = hebbian_gain(0.1, 1.0, 0.5, 0.2, 0.9);
        let g_high = hebbian_gain(0.9, 1.0, 0.5, 0.2, 0.9);
        assert!((g_low - 0.1 * 0.9).abs() < 1e-12);
        assert!((g_high - 0.1 * 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_gain_capped_by_max_step() {
        // η·transferred = 50 would overshoot; the cap keeps the step at 0.5.
        let g = hebbian_gain(0.0, 1.0, 10.0, 5.0, 0.5);
        assert!((g - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ten_thousand_traversals_stay_bounded_and_converge() {
        let w_max = 1.0;
        let (eta, transferred, max_step) = (0.1, 0.01, 0.5);
        let mut w = 0.05;
        let mut clamps = 0;

        for _ in 0..10_000 {
            let gain = hebbian_gain(w, w_max, eta, transferred, max_step);
            let (next, clamped) = reinforce(w, gain, w_max);
            assert!(next > w, "weight must strictly increase: {} -> {}", w, next);
            assert!(next < w_max, "weight reached ceiling: {}", next);
            clamps += clamped as usize;
            w = next;
        }

        assert_eq!(clamps, 0);
        assert!(w_max - w < 1e-4, "not converged: headroom {}", w_max - w);
    }

    #[test]
    fn test_reinforce_guard_stays_below_ceiling() {
        let (w, clamped) = reinforce(1.0 - 1e-16, 0.5, 1.0);
        assert!(clamped);
        assert!(w < 1.0);
        let (w, clamped) = reinforce(0.5, f64::INFINITY, 1.0);
        assert!(clamped);
        assert!(w < 1.0);
    }
}
