//! Engine configuration.
//!
//! One TOML document with a table per subsystem. Every table is optional and
//! every field falls back to the named default in [`constants`].
//!
//! ```toml
//! [diffusion]
//! alpha_init = 0.25
//!
//! [criticality]
//! kp = 0.2
//! ki = 0.1
//!
//! [scheduler]
//! min_tick_ms = 50
//! max_tick_ms = 5000
//! ```
//!
//! # Environment Overrides
//!
//! [`EngineConfig::with_env_overrides`] applies `ACTIVATION_GRAPH_*`
//! variables on top of the file values.

mod checks;
pub mod constants;
mod criticality;
mod dynamics;
mod runtime;
mod selection;
mod topology;

#[cfg(test)]
mod tests;

use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

pub use criticality::CriticalityConfig;
pub use dynamics::{DiffusionConfig, LearningConfig};
pub use runtime::{ReconstructionConfig, SchedulerConfig, StimulusConfig};
pub use selection::{EmergenceConfig, GoalConfig, WorkspaceConfig};
pub use topology::TopologyConfig;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "ACTIVATION_GRAPH_";

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub diffusion: DiffusionConfig,
    pub learning: LearningConfig,
    pub criticality: CriticalityConfig,
    pub topology: TopologyConfig,
    pub emergence: EmergenceConfig,
    pub goals: GoalConfig,
    pub workspace: WorkspaceConfig,
    pub scheduler: SchedulerConfig,
    pub stimulus: StimulusConfig,
    pub reconstruction: ReconstructionConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `EngineError::InvalidConfig` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&contents).map_err(|e| {
            EngineError::InvalidConfig(format!(
                "Failed to parse TOML in '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> EngineResult<Self> {
        toml::from_str(toml)
            .map_err(|e| EngineError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::InvalidConfig(format!("Failed to serialize to TOML: {}", e)))
    }

    /// Validate every section, returning the first error found.
    ///
    /// The message is prefixed with the offending table, e.g.
    /// `[criticality] alpha_min (0.6) must not exceed alpha_max (0.5)`.
    pub fn validate(&self) -> EngineResult<()> {
        fn section(name: &str, result: Result<(), String>) -> EngineResult<()> {
            result.map_err(|e| EngineError::InvalidConfig(format!("[{}] {}", name, e)))
        }

        section("diffusion", self.diffusion.validate())?;
        section("learning", self.learning.validate())?;
        section("criticality", self.criticality.validate())?;
        section("topology", self.topology.validate(self.learning.w_max))?;
        section("emergence", self.emergence.validate())?;
        section("goals", self.goals.validate())?;
        section("workspace", self.workspace.validate())?;
        section("scheduler", self.scheduler.validate())?;
        section("stimulus", self.stimulus.validate())?;
        section("reconstruction", self.reconstruction.validate())?;

        let c = &self.criticality;
        if c.enabled {
            let d = &self.diffusion;
            if d.alpha_init < c.alpha_min || d.alpha_init > c.alpha_max {
                return Err(EngineError::InvalidConfig(format!(
                    "[diffusion] alpha_init ({}) outside criticality bounds [{}, {}]",
                    d.alpha_init, c.alpha_min, c.alpha_max
                )));
            }
            if d.decay_state_rate_init < c.decay_min || d.decay_state_rate_init > c.decay_max {
                return Err(EngineError::InvalidConfig(format!(
                    "[diffusion] decay_state_rate_init ({}) outside criticality bounds [{}, {}]",
                    d.decay_state_rate_init, c.decay_min, c.decay_max
                )));
            }
        }
        Ok(())
    }

    /// Apply environment variable overrides.
    ///
    /// # Supported Variables
    ///
    /// | Variable | Config Path |
    /// |----------|-------------|
    /// | `ACTIVATION_GRAPH_MIN_TICK_MS` | `scheduler.min_tick_ms` |
    /// | `ACTIVATION_GRAPH_MAX_TICK_MS` | `scheduler.max_tick_ms` |
    /// | `ACTIVATION_GRAPH_QUEUE_CAPACITY` | `scheduler.queue_capacity` |
    /// | `ACTIVATION_GRAPH_DEBOUNCE_WINDOW_MS` | `scheduler.debounce_window_ms` |
    /// | `ACTIVATION_GRAPH_CRITICALITY_TARGET` | `criticality.target` |
    /// | `ACTIVATION_GRAPH_KP` | `criticality.kp` |
    /// | `ACTIVATION_GRAPH_KI` | `criticality.ki` |
    /// | `ACTIVATION_GRAPH_WORKSPACE_CAPACITY_BASE` | `workspace.capacity_base` |
    /// | `ACTIVATION_GRAPH_LEARNING_RATE_WORKSPACE` | `learning.learning_rate_workspace` |
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        override_from_env("MIN_TICK_MS", &mut self.scheduler.min_tick_ms);
        override_from_env("MAX_TICK_MS", &mut self.scheduler.max_tick_ms);
        override_from_env("QUEUE_CAPACITY", &mut self.scheduler.queue_capacity);
        override_from_env("DEBOUNCE_WINDOW_MS", &mut self.scheduler.debounce_window_ms);
        override_from_env("CRITICALITY_TARGET", &mut self.criticality.target);
        override_from_env("KP", &mut self.criticality.kp);
        override_from_env("KI", &mut self.criticality.ki);
        override_from_env("WORKSPACE_CAPACITY_BASE", &mut self.workspace.capacity_base);
        override_from_env(
            "LEARNING_RATE_WORKSPACE",
            &mut self.learning.learning_rate_workspace,
        );
        self
    }
}

fn override_from_env<T: FromStr>(suffix: &str, slot: &mut T) {
    let name = format!("{}{}", ENV_PREFIX, suffix);
    if let Ok(raw) = env::var(&name) {
        match raw.parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!(variable = %name, value = %raw, "Ignoring unparseable override"),
        }
    }
}
