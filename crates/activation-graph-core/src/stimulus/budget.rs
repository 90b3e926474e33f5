//! How much energy a stimulus injects, and where.

use crate::types::NodeId;

/// Injection factor for the current ρ.
///
/// `target / ρ` clamped to `[min, max]`: a supercritical graph gets less
/// than the stimulus asked for, a dying one more. Neutral while ρ is unknown
/// or degenerate.
pub fn health_factor(rho: Option<f64>, target: f64, min: f64, max: f64) -> f64 {
    match rho {
        Some(rho) if rho.is_finite() && rho > 0.0 => (target / rho).clamp(min, max),
        _ => 1.0,
    }
}

/// Split `budget` over `matches` in proportion to their similarity.
///
/// Non-positive similarities get nothing; if none is positive the budget
/// is split evenly.
pub fn split_budget(budget: f64, matches: &[(NodeId, f64)]) -> Vec<(NodeId, f64)> {
    let mass: f64 = matches.iter().map(|(_, s)| s.max(0.0)).sum();
    if mass <= 0.0 {
        let share = budget / matches.len().max(1) as f64;
        return matches.iter().map(|(id, _)| (*id, share)).collect();
    }
    matches
        .iter()
        .filter(|(_, s)| *s > 0.0)
        .map(|(id, s)| (*id, budget * s / mass))
        .collect()
}
