//! Relative emergence threshold with EMA smoothing.

use serde::{Deserialize, Serialize};

/// `median + 2·stdev` of a score population.
///
/// `None` for an empty population.
pub fn relative_threshold(scores: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let stdev = (sorted.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
    Some(median + 2.0 * stdev)
}

/// Smoothed threshold state.
///
/// A tick is judged against the EMA of previous ticks (or the floor before
/// any history), then this tick's raw value is folded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergenceThreshold {
    floor: f64,
    beta: f64,
    min_population: usize,
    ema: Option<f64>,
}

/// The threshold in force for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdReading {
    /// Threshold applied this tick, never below the floor.
    pub effective: f64,
    /// This tick's unsmoothed value.
    pub raw: f64,
}

impl EmergenceThreshold {
    pub fn new(floor: f64, beta: f64, min_population: usize) -> Self {
        Self {
            floor,
            beta: beta.clamp(0.0, 1.0),
            min_population,
            ema: None,
        }
    }

    /// Threshold for this tick's scores; updates the EMA afterwards.
    ///
    /// Populations smaller than `min_population` are too small for a
    /// meaningful spread and contribute the floor instead.
    pub fn observe(&mut self, scores: &[f64]) -> ThresholdReading {
        let effective = self.ema.unwrap_or(self.floor).max(self.floor);
        let raw = if scores.len() >= self.min_population {
            relative_threshold(scores).unwrap_or(self.floor)
        } else {
            self.floor
        };
        self.ema = Some(match self.ema {
            Some(prev) => self.beta * raw + (1.0 - self.beta) * prev,
            None => raw,
        });
        ThresholdReading { effective, raw }
    }

    pub fn current(&self) -> f64 {
        self.ema.unwrap_or(self.floor).max(self.floor)
    }

    pub fn reset(&mut self) {
        self.ema = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_threshold() {
        // median 3, population stdev sqrt(2)
        let t = relative_threshold(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((t - (3.0 + 2.0 * 2f64.sqrt())).abs() < 1e-12);
        assert_eq!(relative_threshold(&[]), None);
    }

    #[test]
    fn test_floor_before_history_and_for_small_populations() {
        let mut th = EmergenceThreshold::new(0.05, 0.3, 5);
        let first = th.observe(&[10.0, 20.0]);
        assert_eq!(first.effective, 0.05);
        assert_eq!(first.raw, 0.05);
        assert_eq!(th.current(), 0.05);
    }

    #[test]
    fn test_ema_smooths_jumps() {
        let mut th = EmergenceThreshold::new(0.05, 0.3, 3);
        let low = [1.0, 1.0, 1.0];
        let high = [1.0, 1.0, 10.0];
        th.observe(&low); // ema = 1.0
        let raw_high = relative_threshold(&high).unwrap();
        let r = th.observe(&high);
        assert_eq!(r.effective, 1.0);
        let expected = 0.3 * raw_high + 0.7 * 1.0;
        assert!((th.current() - expected).abs() < 1e-12);
        assert!(th.current() < raw_high);
    }
}
