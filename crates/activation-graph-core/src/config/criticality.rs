//! Criticality controller section.

use serde::{Deserialize, Serialize};

use super::checks::{in_range, non_negative, non_zero, ordered, positive};
use super::constants::criticality as c;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalityConfig {
    /// When false, α and δ stay at their initial values.
    pub enabled: bool,
    #[serde(alias = "criticality_target")]
    pub target: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_limit: f64,
    pub alpha_share: f64,
    pub decay_share: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub decay_min: f64,
    pub decay_max: f64,
    pub power_iterations: usize,
    pub power_tolerance: f64,
    /// Re-estimate ρ every N ticks; the last estimate is reused in between.
    pub sample_every_ticks: u64,
    pub history_window: usize,
    /// Run one loop per entity channel next to the global loop.
    pub per_entity: bool,
    pub entity_gain_scale: f64,
    pub entity_idle_ticks: u64,
}

impl Default for CriticalityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: c::TARGET,
            kp: c::KP,
            ki: c::KI,
            kd: c::KD,
            integral_limit: c::INTEGRAL_LIMIT,
            alpha_share: c::ALPHA_SHARE,
            decay_share: c::DECAY_SHARE,
            alpha_min: c::ALPHA_MIN,
            alpha_max: c::ALPHA_MAX,
            decay_min: c::DECAY_MIN,
            decay_max: c::DECAY_MAX,
            power_iterations: c::POWER_ITERATIONS,
            power_tolerance: c::POWER_TOLERANCE,
            sample_every_ticks: 1,
            history_window: c::HISTORY_WINDOW,
            per_entity: true,
            entity_gain_scale: c::ENTITY_GAIN_SCALE,
            entity_idle_ticks: c::ENTITY_IDLE_TICKS,
        }
    }
}

impl CriticalityConfig {
    pub fn validate(&self) -> Result<(), String> {
        positive("target", self.target)?;
        non_negative("kp", self.kp)?;
        non_negative("ki", self.ki)?;
        non_negative("kd", self.kd)?;
        positive("integral_limit", self.integral_limit)?;
        non_negative("alpha_share", self.alpha_share)?;
        non_negative("decay_share", self.decay_share)?;
        in_range("alpha_min", self.alpha_min, 0.0, 0.999)?;
        in_range("alpha_max", self.alpha_max, 0.0, 0.999)?;
        ordered("alpha_min", self.alpha_min, "alpha_max", self.alpha_max)?;
        in_range("decay_min", self.decay_min, 0.0, 0.999)?;
        in_range("decay_max", self.decay_max, 0.0, 0.999)?;
        ordered("decay_min", self.decay_min, "decay_max", self.decay_max)?;
        if self.power_iterations == 0 {
            return Err("power_iterations must be > 0".to_string());
        }
        positive("power_tolerance", self.power_tolerance)?;
        non_zero("sample_every_ticks", self.sample_every_ticks)?;
        if self.history_window < 2 {
            return Err(format!(
                "history_window must be >= 2, got {}",
                self.history_window
            ));
        }
        non_negative("entity_gain_scale", self.entity_gain_scale)?;
        non_zero("entity_idle_ticks", self.entity_idle_ticks)
    }
}
