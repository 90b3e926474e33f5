//! Counting of numeric violations that were corrected in place.
//!
//! A violation is never an error: diffusion clamps negative energy to zero
//! and drops non-finite values, learning clamps weights under `w_max`. The
//! monitor keeps the tally so that a drifting configuration shows up in
//! reports and logs instead of crashing the tick loop.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Violations by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityCounts {
    pub negative_energy: u64,
    pub non_finite: u64,
    pub weight_ceiling: u64,
}

impl StabilityCounts {
    pub fn total(&self) -> u64 {
        self.negative_energy + self.non_finite + self.weight_ceiling
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    fn accumulate(&mut self, other: StabilityCounts) {
        self.negative_energy += other.negative_energy;
        self.non_finite += other.non_finite;
        self.weight_ceiling += other.weight_ceiling;
    }
}

/// Cumulative violation counts plus the last tick that had any.
#[derive(Debug, Clone, Default)]
pub struct StabilityMonitor {
    totals: StabilityCounts,
    last_violation_tick: Option<u64>,
}

impl StabilityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tick's corrections and return them.
    pub fn record(
        &mut self,
        tick: u64,
        negative_energy: usize,
        non_finite: usize,
        weight_ceiling: usize,
    ) -> StabilityCounts {
        let counts = StabilityCounts {
            negative_energy: negative_energy as u64,
            non_finite: non_finite as u64,
            weight_ceiling: weight_ceiling as u64,
        };
        if counts.negative_energy > 0 || counts.non_finite > 0 {
            warn!(
                tick,
                negative_energy = counts.negative_energy,
                non_finite = counts.non_finite,
                "Stability violation: energy clamped"
            );
        }
        if counts.weight_ceiling > 0 {
            // Expected occasionally on highways; only the totals matter.
            debug!(tick, clamps = counts.weight_ceiling, "Link weights clamped under w_max");
        }
        if !counts.is_clean() {
            self.last_violation_tick = Some(tick);
        }
        self.totals.accumulate(counts);
        counts
    }

    pub fn totals(&self) -> StabilityCounts {
        self.totals
    }

    pub fn last_violation_tick(&self) -> Option<u64> {
        self.last_violation_tick
    }
}
