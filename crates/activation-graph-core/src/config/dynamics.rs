//! Diffusion, decay and learning sections.

use serde::{Deserialize, Serialize};

use super::checks::{finite, in_range, non_negative, positive};
use super::constants::{diffusion as d, learning as l};

/// Energy transfer and decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionConfig {
    /// Initial diffusion fraction α (controller moves it afterwards).
    pub alpha_init: f64,
    /// Initial per-step state decay δ_state.
    pub decay_state_rate_init: f64,
    /// Per-step link weight decay δ_weight. Independent of δ_state.
    pub decay_weight_rate_init: f64,
    pub activity_floor: f64,
    pub energy_epsilon: f64,
    pub traversal_epsilon: f64,
    pub dt_cap: f64,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            alpha_init: d::ALPHA_INIT,
            decay_state_rate_init: d::DECAY_STATE_RATE_INIT,
            decay_weight_rate_init: d::DECAY_WEIGHT_RATE_INIT,
            activity_floor: d::ACTIVITY_FLOOR,
            energy_epsilon: d::ENERGY_EPSILON,
            traversal_epsilon: d::TRAVERSAL_EPSILON,
            dt_cap: d::DT_CAP,
        }
    }
}

impl DiffusionConfig {
    pub fn validate(&self) -> Result<(), String> {
        in_range("alpha_init", self.alpha_init, 0.0, 0.999)?;
        in_range("decay_state_rate_init", self.decay_state_rate_init, 0.0, 0.999)?;
        in_range("decay_weight_rate_init", self.decay_weight_rate_init, 0.0, 0.999)?;
        non_negative("activity_floor", self.activity_floor)?;
        non_negative("energy_epsilon", self.energy_epsilon)?;
        non_negative("traversal_epsilon", self.traversal_epsilon)?;
        if self.energy_epsilon > self.activity_floor {
            return Err(format!(
                "energy_epsilon ({}) must not exceed activity_floor ({})",
                self.energy_epsilon, self.activity_floor
            ));
        }
        in_range("dt_cap", self.dt_cap, 1.0, 1_000.0)
    }
}

/// Bounded Hebbian learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub enabled: bool,
    pub learning_rate_workspace: f64,
    /// `learning_rate_peripheral_ratio`: η_peripheral = ratio · η_workspace.
    #[serde(alias = "learning_rate_peripheral_ratio")]
    pub peripheral_ratio: f64,
    /// Whether below-workspace traversals learn at all.
    pub peripheral_learning: bool,
    pub w_max: f64,
    pub max_step: f64,
    pub highway_threshold: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            learning_rate_workspace: l::LEARNING_RATE_WORKSPACE,
            peripheral_ratio: l::PERIPHERAL_RATIO,
            peripheral_learning: true,
            w_max: l::W_MAX,
            max_step: l::MAX_STEP,
            highway_threshold: l::HIGHWAY_THRESHOLD,
        }
    }
}

impl LearningConfig {
    /// η for a traversal in the given context.
    pub fn learning_rate(&self, workspace_level: bool) -> f64 {
        if workspace_level {
            self.learning_rate_workspace
        } else if self.peripheral_learning {
            self.learning_rate_workspace * self.peripheral_ratio
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        non_negative("learning_rate_workspace", self.learning_rate_workspace)?;
        in_range("peripheral_ratio", self.peripheral_ratio, 0.0, 1.0)?;
        positive("w_max", self.w_max)?;
        finite("max_step", self.max_step)?;
        if !(self.max_step > 0.0 && self.max_step < 1.0) {
            return Err(format!("max_step must be in (0, 1), got {}", self.max_step));
        }
        in_range("highway_threshold", self.highway_threshold, 0.0, self.w_max)
    }
}
