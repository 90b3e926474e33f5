//! Scheduler, stimulus and reconstruction sections.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::checks::{in_range, non_negative, ordered, positive};
use super::constants::{reconstruction as r, scheduler as s, stimulus as st};

/// Tick cadence and intake limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub min_tick_ms: u64,
    pub max_tick_ms: u64,
    /// Dormancy below this keeps the cadence at `min_tick_ms`.
    pub reactive_window_ms: u64,
    /// Slope of the logarithmic growth past the reactive window.
    pub reflective_growth: f64,
    /// EMA weight for the idle interval; 0 disables smoothing.
    pub interval_ema_beta: f64,
    #[serde(alias = "stimulus_debounce_window")]
    pub debounce_window_ms: u64,
    pub queue_capacity: usize,
    pub command_capacity: usize,
    pub max_batch: usize,
    /// Save a snapshot every N ticks when a store is attached; 0 disables.
    pub autosave_every_ticks: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_tick_ms: s::MIN_TICK_MS,
            max_tick_ms: s::MAX_TICK_MS,
            reactive_window_ms: s::REACTIVE_WINDOW_MS,
            reflective_growth: s::REFLECTIVE_GROWTH,
            interval_ema_beta: 0.0,
            debounce_window_ms: s::DEBOUNCE_WINDOW_MS,
            queue_capacity: s::QUEUE_CAPACITY,
            command_capacity: s::COMMAND_CAPACITY,
            max_batch: s::MAX_BATCH,
            autosave_every_ticks: 0,
        }
    }
}

impl SchedulerConfig {
    pub fn min_tick(&self) -> Duration {
        Duration::from_millis(self.min_tick_ms)
    }

    pub fn max_tick(&self) -> Duration {
        Duration::from_millis(self.max_tick_ms)
    }

    pub fn reactive_window(&self) -> Duration {
        Duration::from_millis(self.reactive_window_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_tick_ms == 0 {
            return Err("min_tick_ms must be > 0".to_string());
        }
        if self.max_tick_ms < self.min_tick_ms {
            return Err(format!(
                "max_tick_ms ({}) must be >= min_tick_ms ({})",
                self.max_tick_ms, self.min_tick_ms
            ));
        }
        if self.reactive_window_ms == 0 {
            return Err("reactive_window_ms must be > 0".to_string());
        }
        if self.debounce_window_ms > s::MAX_DEBOUNCE_WINDOW_MS {
            return Err(format!(
                "debounce_window_ms must be <= {}, got {}",
                s::MAX_DEBOUNCE_WINDOW_MS,
                self.debounce_window_ms
            ));
        }
        non_negative("reflective_growth", self.reflective_growth)?;
        in_range("interval_ema_beta", self.interval_ema_beta, 0.0, 1.0)?;
        if self.queue_capacity == 0 || self.command_capacity == 0 || self.max_batch == 0 {
            return Err("queue_capacity, command_capacity and max_batch must be > 0".to_string());
        }
        Ok(())
    }
}

/// Stimulus entry resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Cosine needed for an embedding entry to resolve to an existing node.
    pub resolve_threshold: f64,
    /// Create a node for embedding entries that resolve to nothing.
    pub create_on_miss: bool,
    /// Scale injected energy by how far ρ sits from its target. Only takes
    /// effect while the criticality controller is enabled.
    pub health_modulation: bool,
    pub health_min: f64,
    pub health_max: f64,
    /// Embedding entries split their strength over up to this many nodes
    /// above `resolve_threshold`, in proportion to similarity.
    pub max_matches: usize,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            resolve_threshold: st::RESOLVE_THRESHOLD,
            create_on_miss: true,
            health_modulation: true,
            health_min: st::HEALTH_MIN,
            health_max: st::HEALTH_MAX,
            max_matches: st::MAX_MATCHES,
        }
    }
}

impl StimulusConfig {
    pub fn validate(&self) -> Result<(), String> {
        in_range("resolve_threshold", self.resolve_threshold, -1.0, 1.0)?;
        positive("health_min", self.health_min)?;
        positive("health_max", self.health_max)?;
        if self.health_min > 1.0 || self.health_max < 1.0 {
            return Err(format!(
                "health_min ({}) and health_max ({}) must bracket 1",
                self.health_min, self.health_max
            ));
        }
        if self.max_matches == 0 {
            return Err("max_matches must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Spread-activation replay parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    pub max_hops: usize,
    pub energy_budget: f64,
    /// Fraction of a node's activation passed on per hop.
    pub spread_fraction: f64,
    pub min_activation: f64,
    pub max_nodes: usize,
    /// Scale of the replayed pattern added back as priming energy.
    pub priming_scale: f64,
    /// With an affect cue, each link weight is scaled by
    /// `exp(resonance * cos(cue, link affect))`, clamped to
    /// `[resonance_min, resonance_max]`. Zero ignores affect.
    pub resonance: f64,
    pub resonance_min: f64,
    pub resonance_max: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            max_hops: r::MAX_HOPS,
            energy_budget: r::ENERGY_BUDGET,
            spread_fraction: r::SPREAD_FRACTION,
            min_activation: r::MIN_ACTIVATION,
            max_nodes: r::MAX_NODES,
            priming_scale: r::PRIMING_SCALE,
            resonance: r::RESONANCE,
            resonance_min: r::RESONANCE_MIN,
            resonance_max: r::RESONANCE_MAX,
        }
    }
}

impl ReconstructionConfig {
    pub fn validate(&self) -> Result<(), String> {
        positive("energy_budget", self.energy_budget)?;
        if !(self.spread_fraction > 0.0 && self.spread_fraction < 1.0) {
            return Err(format!(
                "spread_fraction must be in (0, 1), got {}",
                self.spread_fraction
            ));
        }
        non_negative("min_activation", self.min_activation)?;
        if self.max_nodes == 0 {
            return Err("max_nodes must be > 0".to_string());
        }
        non_negative("priming_scale", self.priming_scale)?;
        non_negative("resonance", self.resonance)?;
        positive("resonance_min", self.resonance_min)?;
        ordered("resonance_min", self.resonance_min, "resonance_max", self.resonance_max)?;
        if self.resonance_min > 1.0 || self.resonance_max < 1.0 {
            return Err(format!(
                "resonance_min ({}) and resonance_max ({}) must bracket 1",
                self.resonance_min, self.resonance_max
            ));
        }
        Ok(())
    }
}
