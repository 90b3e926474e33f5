//! Goal sources and goal values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::constants::goals as g;
use crate::types::Embedding;

/// Where a goal came from, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalSource {
    External,
    Scheduled,
    Emergent,
    Stimulus,
    Default,
}

impl GoalSource {
    pub fn all() -> [GoalSource; 5] {
        [
            Self::External,
            Self::Scheduled,
            Self::Emergent,
            Self::Stimulus,
            Self::Default,
        ]
    }

    pub fn priority_weight(self) -> f64 {
        match self {
            Self::External => g::WEIGHT_EXTERNAL,
            Self::Scheduled => g::WEIGHT_SCHEDULED,
            Self::Emergent => g::WEIGHT_EMERGENT,
            Self::Stimulus => g::WEIGHT_STIMULUS,
            Self::Default => g::WEIGHT_DEFAULT,
        }
    }
}

impl fmt::Display for GoalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::External => "external",
            Self::Scheduled => "scheduled",
            Self::Emergent => "emergent",
            Self::Stimulus => "stimulus",
            Self::Default => "default",
        };
        write!(f, "{}", s)
    }
}

/// The goal in force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub embedding: Embedding,
    pub source: GoalSource,
    pub confidence: f64,
    /// Tick at which this source was last selected.
    pub selected_tick: u64,
}

impl Goal {
    pub fn new(source: GoalSource, embedding: Embedding, confidence: f64, tick: u64) -> Self {
        Self {
            embedding,
            source,
            confidence: confidence.clamp(0.0, 1.0),
            selected_tick: tick,
        }
    }

    /// `priority_weight(source) × confidence`.
    pub fn score(&self) -> f64 {
        self.source.priority_weight() * self.confidence
    }
}

/// A goal that applies during `[from_tick, until_tick)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGoal {
    pub embedding: Embedding,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
    pub from_tick: u64,
    /// Open-ended when `None`.
    #[serde(default)]
    pub until_tick: Option<u64>,
}

fn full_confidence() -> f64 {
    1.0
}

impl ScheduledGoal {
    pub fn is_active(&self, tick: u64) -> bool {
        tick >= self.from_tick && self.until_tick.map_or(true, |end| tick < end)
    }

    pub fn is_expired(&self, tick: u64) -> bool {
        self.until_tick.map_or(false, |end| tick >= end)
    }
}
