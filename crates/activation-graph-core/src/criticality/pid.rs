//! PI(D) controller with anti-windup.

use serde::{Deserialize, Serialize};

/// Positional PI controller with an optional derivative term.
///
/// `u = kp·e + ki·I + kd·de/dt`, where `I` is the accumulated error clamped to
/// `±integral_limit`. State is owned by the instance; nothing is shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    integral_limit: f64,
    integral: f64,
    previous_error: Option<f64>,
    last_output: f64,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64, integral_limit: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limit: integral_limit.abs(),
            integral: 0.0,
            previous_error: None,
            last_output: 0.0,
        }
    }

    /// Proportional-only controller, used as the comparison baseline.
    pub fn proportional(kp: f64) -> Self {
        Self::new(kp, 0.0, 0.0, 0.0)
    }

    /// Integrate one error sample over `dt` and return the new output.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        if !error.is_finite() {
            tracing::warn!(error, "Ignoring non-finite controller error");
            return self.last_output;
        }
        let dt = if dt > 0.0 && dt.is_finite() { dt } else { 1.0 };

        if self.ki != 0.0 {
            self.integral =
                (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
        }
        let derivative = match self.previous_error {
            Some(prev) if self.kd != 0.0 => (error - prev) / dt,
            _ => 0.0,
        };
        self.previous_error = Some(error);

        self.last_output = self.kp * error + self.ki * self.integral + self.kd * derivative;
        self.last_output
    }

    /// Keep the previous output without integrating (no measurement).
    pub fn hold(&self) -> f64 {
        self.last_output
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = None;
        self.last_output = 0.0;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }
}
