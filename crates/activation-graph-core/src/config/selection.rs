//! Emergence, goal and workspace sections.

use serde::{Deserialize, Serialize};

use super::checks::{in_range, non_negative, ordered, positive};
use super::constants::{emergence as e, goals as g, workspace as w};

/// Entity cluster emergence thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergenceConfig {
    /// New clusters must exceed `enter_margin · τ`.
    pub enter_margin: f64,
    /// Active clusters persist down to `exit_margin · τ`.
    pub exit_margin: f64,
    pub score_floor: f64,
    pub min_cluster_energy: f64,
    pub min_population_for_relative: usize,
    pub threshold_ema_beta: f64,
    pub max_entities: usize,
    pub identity_overlap: f64,
    pub cost_per_node: f64,
}

impl Default for EmergenceConfig {
    fn default() -> Self {
        Self {
            enter_margin: e::ENTER_MARGIN,
            exit_margin: e::EXIT_MARGIN,
            score_floor: e::SCORE_FLOOR,
            min_cluster_energy: e::MIN_CLUSTER_ENERGY,
            min_population_for_relative: e::MIN_POPULATION_FOR_RELATIVE,
            threshold_ema_beta: e::THRESHOLD_EMA_BETA,
            max_entities: e::MAX_ENTITIES,
            identity_overlap: e::IDENTITY_OVERLAP,
            cost_per_node: e::COST_PER_NODE,
        }
    }
}

impl EmergenceConfig {
    pub fn validate(&self) -> Result<(), String> {
        positive("enter_margin", self.enter_margin)?;
        positive("exit_margin", self.exit_margin)?;
        ordered("exit_margin", self.exit_margin, "enter_margin", self.enter_margin)?;
        positive("score_floor", self.score_floor)?;
        non_negative("min_cluster_energy", self.min_cluster_energy)?;
        if self.min_population_for_relative < 2 {
            return Err("min_population_for_relative must be >= 2".to_string());
        }
        in_range("threshold_ema_beta", self.threshold_ema_beta, 0.0, 1.0)?;
        if self.max_entities == 0 {
            return Err("max_entities must be > 0".to_string());
        }
        in_range("identity_overlap", self.identity_overlap, 0.0, 1.0)?;
        positive("cost_per_node", self.cost_per_node)
    }
}

/// Goal stack hysteresis and the fallback goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    pub switch_margin: f64,
    pub min_dwell_ticks: u64,
    /// Embedding of the unconditional fallback goal. Empty means neutral.
    pub default_embedding: Vec<f32>,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            switch_margin: g::SWITCH_MARGIN,
            min_dwell_ticks: g::MIN_DWELL_TICKS,
            default_embedding: Vec::new(),
        }
    }
}

impl GoalConfig {
    pub fn validate(&self) -> Result<(), String> {
        non_negative("switch_margin", self.switch_margin)?;
        if self.default_embedding.iter().any(|v| !v.is_finite()) {
            return Err("default_embedding must be finite".to_string());
        }
        Ok(())
    }
}

/// Workspace budget and stickiness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    #[serde(alias = "workspace_capacity_base")]
    pub capacity_base: f64,
    #[serde(alias = "workspace_capacity_min")]
    pub capacity_min: f64,
    #[serde(alias = "workspace_capacity_max")]
    pub capacity_max: f64,
    /// Capacity growth per active entity.
    pub entity_gain: f64,
    pub incumbent_bonus: f64,
    pub challenger_penalty: f64,
    pub min_dwell_ticks: u64,
    /// Score floor at ρ = target; scaled by the systemic ρ.
    pub admission_min_score: f64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            capacity_base: w::CAPACITY_BASE,
            capacity_min: w::CAPACITY_MIN,
            capacity_max: w::CAPACITY_MAX,
            entity_gain: w::ENTITY_GAIN,
            incumbent_bonus: w::INCUMBENT_BONUS,
            challenger_penalty: w::CHALLENGER_PENALTY,
            min_dwell_ticks: w::MIN_DWELL_TICKS,
            admission_min_score: w::ADMISSION_MIN_SCORE,
        }
    }
}

impl WorkspaceConfig {
    pub fn validate(&self) -> Result<(), String> {
        positive("capacity_base", self.capacity_base)?;
        positive("capacity_min", self.capacity_min)?;
        positive("capacity_max", self.capacity_max)?;
        ordered("capacity_min", self.capacity_min, "capacity_max", self.capacity_max)?;
        non_negative("entity_gain", self.entity_gain)?;
        non_negative("incumbent_bonus", self.incumbent_bonus)?;
        in_range("challenger_penalty", self.challenger_penalty, 0.0, 0.999)?;
        non_negative("admission_min_score", self.admission_min_score)
    }
}
