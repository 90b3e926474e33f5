//! Topology evolution section.

use serde::{Deserialize, Serialize};

use super::checks::{in_range, non_negative, non_zero, positive};
use super::constants::topology as t;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Automatic creation and pruning. Explicit links work either way.
    pub enabled: bool,
    pub coactivation_window: usize,
    pub min_samples: usize,
    pub coactivation_every_ticks: u64,
    pub semantic_every_ticks: u64,
    pub coactivation_top_k: usize,
    pub min_correlation: f64,
    pub semantic_threshold: f64,
    pub weight_coactivation: f64,
    pub weight_semantic: f64,
    pub weight_explicit: f64,
    pub creation_threshold: f64,
    pub per_tick_budget: usize,
    pub max_new_outdegree: usize,
    pub initial_weight: f64,
    pub explicit_weight: f64,
    pub graduation_weight: f64,
    pub probation_ticks: u64,
    pub prune_epsilon: f64,
    pub prune_every_ticks: u64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            coactivation_window: t::COACTIVATION_WINDOW,
            min_samples: t::MIN_SAMPLES,
            coactivation_every_ticks: t::COACTIVATION_EVERY_TICKS,
            semantic_every_ticks: t::SEMANTIC_EVERY_TICKS,
            coactivation_top_k: t::COACTIVATION_TOP_K,
            min_correlation: t::MIN_CORRELATION,
            semantic_threshold: t::SEMANTIC_THRESHOLD,
            weight_coactivation: t::WEIGHT_COACTIVATION,
            weight_semantic: t::WEIGHT_SEMANTIC,
            weight_explicit: t::WEIGHT_EXPLICIT,
            creation_threshold: t::CREATION_THRESHOLD,
            per_tick_budget: t::PER_TICK_BUDGET,
            max_new_outdegree: t::MAX_NEW_OUTDEGREE,
            initial_weight: t::INITIAL_WEIGHT,
            explicit_weight: t::EXPLICIT_WEIGHT,
            graduation_weight: t::GRADUATION_WEIGHT,
            probation_ticks: t::PROBATION_TICKS,
            prune_epsilon: t::PRUNE_EPSILON,
            prune_every_ticks: t::PRUNE_EVERY_TICKS,
        }
    }
}

impl TopologyConfig {
    /// `w_max` comes from the learning section.
    pub fn validate(&self, w_max: f64) -> Result<(), String> {
        if self.min_samples < 3 || self.min_samples > self.coactivation_window {
            return Err(format!(
                "min_samples must be in [3, coactivation_window={}], got {}",
                self.coactivation_window, self.min_samples
            ));
        }
        non_zero("coactivation_every_ticks", self.coactivation_every_ticks)?;
        non_zero("semantic_every_ticks", self.semantic_every_ticks)?;
        if self.coactivation_top_k < 2 {
            return Err("coactivation_top_k must be >= 2".to_string());
        }
        in_range("min_correlation", self.min_correlation, -1.0, 1.0)?;
        in_range("semantic_threshold", self.semantic_threshold, -1.0, 1.0)?;
        non_negative("weight_coactivation", self.weight_coactivation)?;
        non_negative("weight_semantic", self.weight_semantic)?;
        non_negative("weight_explicit", self.weight_explicit)?;
        positive("creation_threshold", self.creation_threshold)?;
        if self.weight_explicit < self.creation_threshold {
            return Err(format!(
                "weight_explicit ({}) must reach creation_threshold ({})",
                self.weight_explicit, self.creation_threshold
            ));
        }
        // A qualifying pair must be able to clear the fused threshold alone.
        let reaches = |name: &str, weight: f64, floor_name: &str, floor: f64| -> Result<(), String> {
            if weight > 0.0 && weight * floor < self.creation_threshold {
                return Err(format!(
                    "{} ({}) * {} ({}) is below creation_threshold ({})",
                    name, weight, floor_name, floor, self.creation_threshold
                ));
            }
            Ok(())
        };
        reaches(
            "weight_coactivation",
            self.weight_coactivation,
            "min_correlation",
            self.min_correlation,
        )?;
        reaches(
            "weight_semantic",
            self.weight_semantic,
            "semantic_threshold",
            self.semantic_threshold,
        )?;
        if self.max_new_outdegree == 0 {
            return Err("max_new_outdegree must be > 0".to_string());
        }
        let below_ceiling = |name: &str, v: f64| -> Result<(), String> {
            if !(v > 0.0 && v < w_max) {
                return Err(format!("{} must be in (0, w_max={}), got {}", name, w_max, v));
            }
            Ok(())
        };
        below_ceiling("initial_weight", self.initial_weight)?;
        below_ceiling("explicit_weight", self.explicit_weight)?;
        below_ceiling("graduation_weight", self.graduation_weight)?;
        non_negative("prune_epsilon", self.prune_epsilon)?;
        if self.prune_epsilon >= self.initial_weight {
            return Err(format!(
                "prune_epsilon ({}) must be below initial_weight ({})",
                self.prune_epsilon, self.initial_weight
            ));
        }
        non_zero("probation_ticks", self.probation_ticks)?;
        non_zero("prune_every_ticks", self.prune_every_ticks)
    }
}
