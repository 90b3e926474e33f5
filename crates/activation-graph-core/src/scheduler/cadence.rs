//! Piecewise-adaptive tick cadence.
//!
//! # Algorithm
//!
//! With `s` the time since the last stimulus:
//!
//! - reactive (`s ≤ reactive_window`): `min_tick`
//! - reflective: `min + (max − min) · g · ln(s / window) / ln(max / min)`,
//!   where `g` is `reflective_growth`
//! - idle: the above saturates at `max_tick`
//!
//! With `g = 1` the interval reaches `max_tick` once dormancy has lasted
//! `window · max / min`. The integration step of a tick is the elapsed
//! interval measured in `min_tick` units, at least 1 and capped by the
//! diffusion `dt_cap`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;

/// Which part of the cadence curve an interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceRegime {
    Reactive,
    Reflective,
    Idle,
}

/// Cadence state owned by one scheduler.
#[derive(Debug, Clone)]
pub struct Cadence {
    min: Duration,
    max: Duration,
    reactive_window: Duration,
    growth: f64,
    ema_beta: f64,
    smoothed_ms: Option<f64>,
}

impl Cadence {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            min: config.min_tick(),
            max: config.max_tick(),
            reactive_window: config.reactive_window(),
            growth: config.reflective_growth,
            ema_beta: config.interval_ema_beta,
            smoothed_ms: None,
        }
    }

    pub fn min_tick(&self) -> Duration {
        self.min
    }

    pub fn max_tick(&self) -> Duration {
        self.max
    }

    /// Unsmoothed interval for a dormancy of `since_stimulus`.
    pub fn raw_interval(&self, since_stimulus: Duration) -> (Duration, CadenceRegime) {
        if since_stimulus <= self.reactive_window || self.max <= self.min {
            return (self.min, CadenceRegime::Reactive);
        }
        let min_ms = self.min.as_secs_f64() * 1_000.0;
        let max_ms = self.max.as_secs_f64() * 1_000.0;
        let ratio = since_stimulus.as_secs_f64() / self.reactive_window.as_secs_f64();
        let progress = self.growth * ratio.ln() / (max_ms / min_ms).ln();
        if !progress.is_finite() || progress >= 1.0 {
            return (self.max, CadenceRegime::Idle);
        }
        let ms = min_ms + (max_ms - min_ms) * progress.max(0.0);
        (Duration::from_secs_f64(ms / 1_000.0), CadenceRegime::Reflective)
    }

    /// Interval until the next scheduled tick.
    ///
    /// Outside the reactive regime the interval is smoothed with an EMA when
    /// `interval_ema_beta > 0`. A reactive interval is never smoothed and
    /// resets the average, so a stimulus is never held back.
    pub fn next_interval(&mut self, since_stimulus: Duration) -> (Duration, CadenceRegime) {
        let (raw, regime) = self.raw_interval(since_stimulus);
        if regime == CadenceRegime::Reactive || self.ema_beta <= 0.0 {
            self.smoothed_ms = None;
            return (raw, regime);
        }
        let raw_ms = raw.as_secs_f64() * 1_000.0;
        let smoothed = match self.smoothed_ms {
            Some(prev) => self.ema_beta * prev + (1.0 - self.ema_beta) * raw_ms,
            None => raw_ms,
        };
        self.smoothed_ms = Some(smoothed);
        let interval = Duration::from_secs_f64(smoothed / 1_000.0).clamp(self.min, self.max);
        (interval, regime)
    }

    /// Integration step for a tick that follows `elapsed` of wall time.
    pub fn dt(&self, elapsed: Duration, dt_cap: f64) -> f64 {
        let steps = elapsed.max(self.min).as_secs_f64() / self.min.as_secs_f64();
        steps.min(dt_cap.max(1.0))
    }
}
