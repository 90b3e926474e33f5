//! Closed-loop regulation of α and δ_state toward ρ = target.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::constants::criticality as bands;
use crate::config::CriticalityConfig;
use crate::dynamics::{ChannelRates, RateTable};
use crate::graph::{Frontier, GraphStore};
use crate::types::EntityId;

use super::{estimate_spectral_radius, PidController, PowerIterationParams, SpectralEstimate};

/// Coarse classification of a ρ estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyState {
    /// Activity is collapsing.
    Dying,
    Subcritical,
    Critical,
    /// Activity is amplifying.
    Supercritical,
}

impl SafetyState {
    pub fn from_rho(rho: f64) -> Self {
        if rho < bands::DYING_BELOW {
            Self::Dying
        } else if rho < bands::SUBCRITICAL_BELOW {
            Self::Subcritical
        } else if rho < bands::CRITICAL_BELOW {
            Self::Critical
        } else {
            Self::Supercritical
        }
    }
}

/// Rolling statistics of a loop's ρ history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopDiagnostics {
    pub samples: usize,
    pub rho_mean: f64,
    pub rho_variance: f64,
    /// Fraction of consecutive samples whose error changed sign.
    pub oscillation_index: f64,
}

/// One control loop: PI state plus the rates it currently prescribes.
#[derive(Debug, Clone)]
pub struct CriticalityLoop {
    pid: PidController,
    rates: ChannelRates,
    rho: Option<f64>,
    history: VecDeque<f64>,
    window: usize,
    idle_ticks: u64,
}

impl CriticalityLoop {
    pub fn new(config: &CriticalityConfig, rates: ChannelRates) -> Self {
        Self {
            pid: PidController::new(config.kp, config.ki, config.kd, config.integral_limit),
            rates,
            rho: None,
            history: VecDeque::with_capacity(config.history_window),
            window: config.history_window,
            idle_ticks: 0,
        }
    }

    /// Feed one measurement and derive rates around `base`.
    ///
    /// `None` means nothing was measurable (empty frontier): the controller
    /// output is held and the integral does not move. `scale` shrinks the
    /// correction for loops layered on top of another loop.
    pub fn observe(
        &mut self,
        rho: Option<f64>,
        base: ChannelRates,
        dt: f64,
        config: &CriticalityConfig,
        scale: f64,
    ) -> ChannelRates {
        let output = match rho.filter(|r| r.is_finite()) {
            Some(r) => {
                self.record(r);
                self.pid.update(r - config.target, dt)
            }
            None => self.pid.hold(),
        };
        self.rates = map_output(base, output * scale, config);
        self.rates
    }

    /// Store a measurement without acting on it (control disabled).
    pub fn record(&mut self, rho: f64) {
        self.rho = Some(rho);
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(rho);
    }

    pub fn rates(&self) -> ChannelRates {
        self.rates
    }

    pub fn rho(&self) -> Option<f64> {
        self.rho
    }

    pub fn safety(&self) -> Option<SafetyState> {
        self.rho.map(SafetyState::from_rho)
    }

    pub fn integral(&self) -> f64 {
        self.pid.integral()
    }

    pub fn diagnostics(&self, target: f64) -> LoopDiagnostics {
        let n = self.history.len();
        if n == 0 {
            return LoopDiagnostics::default();
        }
        let mean = self.history.iter().sum::<f64>() / n as f64;
        let variance = self.history.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64;
        let flips = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .filter(|(a, b)| (**a - target).signum() != (**b - target).signum())
            .count();
        LoopDiagnostics {
            samples: n,
            rho_mean: mean,
            rho_variance: variance,
            oscillation_index: if n > 1 { flips as f64 / (n - 1) as f64 } else { 0.0 },
        }
    }
}

fn map_output(base: ChannelRates, output: f64, config: &CriticalityConfig) -> ChannelRates {
    ChannelRates {
        alpha: (base.alpha - config.alpha_share * output).clamp(config.alpha_min, config.alpha_max),
        state_decay: (base.state_decay + config.decay_share * output)
            .clamp(config.decay_min, config.decay_max),
    }
}

/// Observable criticality state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalitySnapshot {
    /// Last global ρ; `None` until something has been active.
    pub global: Option<f64>,
    pub per_entity: BTreeMap<EntityId, f64>,
    pub safety: Option<SafetyState>,
    pub rates: ChannelRates,
    pub entity_rates: BTreeMap<EntityId, ChannelRates>,
    pub integral: f64,
    pub diagnostics: LoopDiagnostics,
    /// Active nodes after the last pass divided by active nodes before it.
    pub branching_ratio: Option<f64>,
}

/// Global loop plus one loop per entity channel.
#[derive(Debug, Clone)]
pub struct CriticalityController {
    config: CriticalityConfig,
    base: ChannelRates,
    global: CriticalityLoop,
    entities: BTreeMap<EntityId, CriticalityLoop>,
    last_estimate: Option<SpectralEstimate>,
    branching_ratio: Option<f64>,
}

impl CriticalityController {
    /// `base` holds the initial diffusion fraction and state decay rate.
    pub fn new(config: CriticalityConfig, base: ChannelRates) -> Self {
        Self {
            global: CriticalityLoop::new(&config, base),
            config,
            base,
            entities: BTreeMap::new(),
            last_estimate: None,
            branching_ratio: None,
        }
    }

    fn power_params(&self) -> PowerIterationParams {
        PowerIterationParams {
            max_iterations: self.config.power_iterations,
            tolerance: self.config.power_tolerance,
        }
    }

    /// Rates in force for the next diffusion pass.
    pub fn rate_table(&self) -> RateTable {
        let mut table = RateTable::new(self.global.rates());
        for (entity, lp) in &self.entities {
            table.set_entity(*entity, lp.rates());
        }
        table
    }

    /// Measure ρ on the frontier and update every loop.
    pub fn update(
        &mut self,
        store: &GraphStore,
        frontier: &Frontier,
        tick: u64,
        dt: f64,
        branching_ratio: Option<f64>,
    ) -> CriticalitySnapshot {
        self.branching_ratio = branching_ratio;
        let params = self.power_params();
        let sample = tick % self.config.sample_every_ticks == 0 || self.global.rho().is_none();

        let global_rho = if sample {
            let estimate =
                estimate_spectral_radius(store, frontier.active(), self.global.rates(), params);
            if let Some(e) = estimate {
                if !e.converged {
                    debug!(tick, rho = e.rho, iterations = e.iterations, "Power iteration did not converge");
                }
                self.last_estimate = Some(e);
            }
            estimate.map(|e| e.rho)
        } else {
            self.global.rho()
        };

        if self.config.enabled {
            let before = self.global.safety();
            self.global.observe(global_rho, self.base, dt, &self.config, 1.0);
            let after = self.global.safety();
            if before != after {
                if let (Some(state), Some(rho)) = (after, global_rho) {
                    match state {
                        SafetyState::Dying | SafetyState::Supercritical => {
                            warn!(tick, rho, ?state, "Criticality left the safe band")
                        }
                        _ => debug!(tick, rho, ?state, "Criticality band changed"),
                    }
                }
            }
        } else if let Some(rho) = global_rho {
            self.global.record(rho);
        }

        if self.config.per_entity {
            self.update_entities(store, frontier, sample, dt, params);
        }

        self.snapshot()
    }

    fn update_entities(
        &mut self,
        store: &GraphStore,
        frontier: &Frontier,
        sample: bool,
        dt: f64,
        params: PowerIterationParams,
    ) {
        let global_rates = self.global.rates();
        let mut seen = Vec::new();

        for entity in store.entities() {
            let nodes = frontier.active_in(store, entity);
            if nodes.is_empty() {
                continue;
            }
            seen.push(entity);
            let lp = self
                .entities
                .entry(entity)
                .or_insert_with(|| CriticalityLoop::new(&self.config, global_rates));
            lp.idle_ticks = 0;

            let rho = if sample {
                estimate_spectral_radius(store, &nodes, lp.rates(), params).map(|e| e.rho)
            } else {
                lp.rho()
            };
            if self.config.enabled {
                lp.observe(rho, global_rates, dt, &self.config, self.config.entity_gain_scale);
            } else if let Some(r) = rho {
                lp.record(r);
            }
        }

        let idle_limit = self.config.entity_idle_ticks;
        self.entities.retain(|entity, lp| {
            if seen.contains(entity) {
                return true;
            }
            lp.idle_ticks += 1;
            lp.rates = global_rates;
            lp.idle_ticks <= idle_limit
        });
    }

    pub fn snapshot(&self) -> CriticalitySnapshot {
        CriticalitySnapshot {
            global: self.global.rho(),
            per_entity: self
                .entities
                .iter()
                .filter_map(|(e, lp)| lp.rho().map(|r| (*e, r)))
                .collect(),
            safety: self.global.safety(),
            rates: self.global.rates(),
            entity_rates: self.entities.iter().map(|(e, lp)| (*e, lp.rates())).collect(),
            integral: self.global.integral(),
            diagnostics: self.global.diagnostics(self.config.target),
            branching_ratio: self.branching_ratio,
        }
    }

    pub fn global_rho(&self) -> Option<f64> {
        self.global.rho()
    }

    pub fn entity_rho(&self, entity: EntityId) -> Option<f64> {
        self.entities.get(&entity).and_then(|lp| lp.rho())
    }

    pub fn last_estimate(&self) -> Option<SpectralEstimate> {
        self.last_estimate
    }

    pub fn target(&self) -> f64 {
        self.config.target
    }

    /// Forget all loop state (used after a snapshot load).
    pub fn reset(&mut self) {
        self.global = CriticalityLoop::new(&self.config, self.base);
        self.entities.clear();
        self.last_estimate = None;
        self.branching_ratio = None;
    }
}
