//! Priority stack with switch hysteresis.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GoalConfig;
use crate::types::Embedding;

use super::source::{Goal, GoalSource, ScheduledGoal};

/// Workspace-derived inputs for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct GoalContext {
    /// Whether the previous tick's workspace was empty.
    pub workspace_empty: bool,
    /// Energy-weighted centroid of the workspace and its confidence.
    pub emergent: Option<(Embedding, f64)>,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalUpdate {
    pub source: GoalSource,
    pub switched: bool,
    /// The stack fell through to the default goal this tick.
    pub deadlock_avoided: bool,
}

#[derive(Debug, Clone, Copy)]
struct Challenger {
    source: GoalSource,
    since_tick: u64,
}

/// Owns goal state for one engine.
#[derive(Debug, Clone)]
pub struct GoalManager {
    config: GoalConfig,
    current: Goal,
    external: Option<(Embedding, f64)>,
    scheduled: Vec<ScheduledGoal>,
    pending_stimulus: Option<Embedding>,
    challenger: Option<Challenger>,
    deadlock_avoided: u64,
    switches: u64,
}

impl GoalManager {
    /// Starts on the default goal.
    pub fn new(config: GoalConfig) -> Self {
        let current = Goal::new(GoalSource::Default, config.default_embedding.clone(), 1.0, 0);
        Self {
            config,
            current,
            external: None,
            scheduled: Vec::new(),
            pending_stimulus: None,
            challenger: None,
            deadlock_avoided: 0,
            switches: 0,
        }
    }

    /// The goal in force. Never absent.
    pub fn current(&self) -> &Goal {
        &self.current
    }

    pub fn set_external(&mut self, embedding: Embedding, confidence: f64) {
        self.external = Some((embedding, confidence.clamp(0.0, 1.0)));
    }

    pub fn clear_external(&mut self) {
        self.external = None;
    }

    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }

    /// Register a scheduled goal. Later registrations win over earlier ones.
    pub fn schedule(&mut self, goal: ScheduledGoal) {
        self.scheduled.push(goal);
    }

    /// Remember the embedding of the latest stimulus for cold starts.
    pub fn note_stimulus(&mut self, embedding: Embedding) {
        if !embedding.is_empty() {
            self.pending_stimulus = Some(embedding);
        }
    }

    pub fn deadlock_avoided_count(&self) -> u64 {
        self.deadlock_avoided
    }

    pub fn switch_count(&self) -> u64 {
        self.switches
    }

    /// Re-evaluate the stack for `tick`.
    pub fn update(&mut self, tick: u64, context: GoalContext) -> GoalUpdate {
        self.scheduled.retain(|g| !g.is_expired(tick));
        // A non-empty workspace means the bootstrap stimulus has been taken up.
        if !context.workspace_empty {
            self.pending_stimulus = None;
        }

        let top = self.top_of_stack(tick, &context);
        let deadlock_avoided = top.source == GoalSource::Default;

        if top.source == self.current.source {
            self.current.embedding = top.embedding;
            self.current.confidence = top.confidence;
            self.challenger = None;
            return self.result(false, deadlock_avoided);
        }

        if top.source == GoalSource::External {
            self.switch_to(top, tick);
            return self.result(true, deadlock_avoided);
        }

        let since = match self.challenger {
            Some(c) if c.source == top.source => c.since_tick,
            _ => {
                self.challenger = Some(Challenger {
                    source: top.source,
                    since_tick: tick,
                });
                tick
            }
        };
        let dwelled = tick.saturating_sub(since) >= self.config.min_dwell_ticks;
        let current_present = self.source_present(self.current.source, tick, &context);
        let beats = top.score() > self.current.score() + self.config.switch_margin;

        if dwelled && (!current_present || beats) {
            self.switch_to(top, tick);
            return self.result(true, deadlock_avoided);
        }
        debug!(
            tick,
            current = %self.current.source,
            challenger = %top.source,
            dwelled,
            current_present,
            "Goal change held back"
        );
        self.result(false, deadlock_avoided)
    }

    fn result(&self, switched: bool, deadlock_avoided: bool) -> GoalUpdate {
        GoalUpdate {
            source: self.current.source,
            switched,
            deadlock_avoided,
        }
    }

    fn switch_to(&mut self, mut goal: Goal, tick: u64) {
        info!(
            tick,
            from = %self.current.source,
            to = %goal.source,
            score = goal.score(),
            "Goal switched"
        );
        if goal.source == GoalSource::Default {
            self.deadlock_avoided += 1;
            info!(tick, "No workspace or task goal; falling back to the default goal");
        }
        goal.selected_tick = tick;
        self.current = goal;
        self.challenger = None;
        self.switches += 1;
    }

    fn active_schedule(&self, tick: u64) -> Option<&ScheduledGoal> {
        self.scheduled.iter().rev().find(|g| g.is_active(tick))
    }

    fn source_present(&self, source: GoalSource, tick: u64, context: &GoalContext) -> bool {
        match source {
            GoalSource::External => self.external.is_some(),
            GoalSource::Scheduled => self.active_schedule(tick).is_some(),
            GoalSource::Emergent => !context.workspace_empty && context.emergent.is_some(),
            GoalSource::Stimulus => context.workspace_empty && self.pending_stimulus.is_some(),
            GoalSource::Default => true,
        }
    }

    fn top_of_stack(&self, tick: u64, context: &GoalContext) -> Goal {
        if let Some((embedding, confidence)) = &self.external {
            return Goal::new(GoalSource::External, embedding.clone(), *confidence, tick);
        }
        if let Some(goal) = self.active_schedule(tick) {
            return Goal::new(GoalSource::Scheduled, goal.embedding.clone(), goal.confidence, tick);
        }
        if !context.workspace_empty {
            if let Some((embedding, confidence)) = &context.emergent {
                return Goal::new(GoalSource::Emergent, embedding.clone(), *confidence, tick);
            }
        }
        if context.workspace_empty {
            if let Some(embedding) = &self.pending_stimulus {
                return Goal::new(GoalSource::Stimulus, embedding.clone(), 1.0, tick);
            }
        }
        Goal::new(GoalSource::Default, self.config.default_embedding.clone(), 1.0, tick)
    }

    /// Drop every goal input (used after a snapshot load).
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}
