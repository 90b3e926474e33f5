//! Adaptive workspace budget.

use crate::config::WorkspaceConfig;

/// `base × complexity × (1 + entity_gain × active_entities)`, clamped to
/// `[capacity_min, capacity_max]`. A non-positive or non-finite complexity
/// counts as 1.
pub fn adaptive_capacity(config: &WorkspaceConfig, task_complexity: f64, active_entities: usize) -> f64 {
    let complexity = if task_complexity.is_finite() && task_complexity > 0.0 {
        task_complexity
    } else {
        1.0
    };
    let raw = config.capacity_base * complexity * (1.0 + config.entity_gain * active_entities as f64);
    raw.clamp(config.capacity_min, config.capacity_max)
}
