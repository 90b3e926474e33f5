//! Named defaults for every tunable.
//!
//! Grouped by subsystem. Values marked *tuning* are starting points that
//! should be revisited against recorded activation traces.

/// Diffusion and state decay.
pub mod diffusion {
    /// Fraction of a node's energy pushed along its out-links per unit step.
    pub const ALPHA_INIT: f64 = 0.25;
    /// Per-step fractional loss of node energy.
    pub const DECAY_STATE_RATE_INIT: f64 = 0.05;
    /// Per-step fractional loss of link weight (plasticity timescale).
    pub const DECAY_WEIGHT_RATE_INIT: f64 = 0.0005;
    /// Energy above which a node counts as active.
    pub const ACTIVITY_FLOOR: f64 = 0.01;
    /// Energies below this are dropped from the sparse map.
    pub const ENERGY_EPSILON: f64 = 1e-12;
    /// Minimum transferred energy that counts as a traversal.
    pub const TRAVERSAL_EPSILON: f64 = 1e-6;
    /// Upper bound on the integration step, in min-tick units.
    pub const DT_CAP: f64 = 5.0;
}

/// Bounded Hebbian learning.
pub mod learning {
    /// *tuning*
    pub const LEARNING_RATE_WORKSPACE: f64 = 0.1;
    /// Peripheral rate as a fraction of the workspace rate. *tuning*
    pub const PERIPHERAL_RATIO: f64 = 0.2;
    /// Soft ceiling; weights approach but never reach it.
    pub const W_MAX: f64 = 1.0;
    /// Cap on the headroom fraction consumed by one traversal. Must be < 1.
    pub const MAX_STEP: f64 = 0.5;
    /// Links above this weight are reported as highways.
    pub const HIGHWAY_THRESHOLD: f64 = 0.7;
}

/// Criticality control loop.
pub mod criticality {
    pub const TARGET: f64 = 1.0;
    /// *tuning*
    pub const KP: f64 = 0.2;
    /// *tuning*
    pub const KI: f64 = 0.1;
    pub const KD: f64 = 0.0;
    /// Anti-windup clamp on the accumulated error.
    pub const INTEGRAL_LIMIT: f64 = 20.0;
    /// Share of the control output applied to the diffusion fraction.
    pub const ALPHA_SHARE: f64 = 0.5;
    /// Share of the control output applied to the state decay rate.
    pub const DECAY_SHARE: f64 = 0.5;
    pub const ALPHA_MIN: f64 = 0.02;
    pub const ALPHA_MAX: f64 = 0.5;
    pub const DECAY_MIN: f64 = 0.0;
    pub const DECAY_MAX: f64 = 0.6;
    pub const POWER_ITERATIONS: usize = 50;
    pub const POWER_TOLERANCE: f64 = 1e-9;
    pub const HISTORY_WINDOW: usize = 50;
    /// Per-entity correction relative to the global loop.
    pub const ENTITY_GAIN_SCALE: f64 = 0.5;
    /// Idle ticks after which a per-entity loop is dropped.
    pub const ENTITY_IDLE_TICKS: u64 = 100;

    /// Safety band edges on ρ.
    pub const DYING_BELOW: f64 = 0.5;
    pub const SUBCRITICAL_BELOW: f64 = 0.8;
    pub const CRITICAL_BELOW: f64 = 1.2;
}

/// Link creation and pruning.
pub mod topology {
    pub const COACTIVATION_WINDOW: usize = 32;
    pub const MIN_SAMPLES: usize = 16;
    pub const COACTIVATION_EVERY_TICKS: u64 = 10;
    pub const SEMANTIC_EVERY_TICKS: u64 = 50;
    pub const COACTIVATION_TOP_K: usize = 64;
    /// *tuning*
    pub const MIN_CORRELATION: f64 = 0.7;
    pub const SEMANTIC_THRESHOLD: f64 = 0.85;
    pub const WEIGHT_COACTIVATION: f64 = 0.6;
    pub const WEIGHT_SEMANTIC: f64 = 0.6;
    pub const WEIGHT_EXPLICIT: f64 = 1.0;
    /// Coactivation at `MIN_CORRELATION` and semantic similarity at
    /// `SEMANTIC_THRESHOLD` must each reach this on their own.
    pub const CREATION_THRESHOLD: f64 = 0.4;
    pub const PER_TICK_BUDGET: usize = 8;
    pub const MAX_NEW_OUTDEGREE: usize = 4;
    pub const INITIAL_WEIGHT: f64 = 0.05;
    pub const EXPLICIT_WEIGHT: f64 = 0.5;
    pub const GRADUATION_WEIGHT: f64 = 0.2;
    pub const PROBATION_TICKS: u64 = 200;
    pub const PRUNE_EPSILON: f64 = 0.001;
    pub const PRUNE_EVERY_TICKS: u64 = 10;
}

/// Entity cluster emergence.
pub mod emergence {
    pub const ENTER_MARGIN: f64 = 1.1;
    pub const EXIT_MARGIN: f64 = 0.9;
    /// Hard floor on the emergence threshold.
    pub const SCORE_FLOOR: f64 = 0.05;
    /// Clusters with less total energy never emerge.
    pub const MIN_CLUSTER_ENERGY: f64 = 0.1;
    /// Below this many candidates the relative threshold is not meaningful.
    pub const MIN_POPULATION_FOR_RELATIVE: usize = 5;
    /// Weight of the newest raw threshold in the EMA. *tuning*
    pub const THRESHOLD_EMA_BETA: f64 = 0.3;
    pub const MAX_ENTITIES: usize = 16;
    pub const IDENTITY_OVERLAP: f64 = 0.5;
    pub const COST_PER_NODE: f64 = 1.0;
}

/// Goal stack.
pub mod goals {
    pub const WEIGHT_EXTERNAL: f64 = 1.0;
    pub const WEIGHT_SCHEDULED: f64 = 0.8;
    pub const WEIGHT_EMERGENT: f64 = 0.6;
    pub const WEIGHT_STIMULUS: f64 = 0.4;
    pub const WEIGHT_DEFAULT: f64 = 0.1;
    pub const SWITCH_MARGIN: f64 = 0.1;
    pub const MIN_DWELL_TICKS: u64 = 5;
}

/// Global workspace.
pub mod workspace {
    pub const CAPACITY_BASE: f64 = 8.0;
    pub const CAPACITY_MIN: f64 = 2.0;
    pub const CAPACITY_MAX: f64 = 32.0;
    pub const ENTITY_GAIN: f64 = 0.1;
    pub const INCUMBENT_BONUS: f64 = 0.1;
    pub const CHALLENGER_PENALTY: f64 = 0.1;
    pub const MIN_DWELL_TICKS: u64 = 3;
    pub const ADMISSION_MIN_SCORE: f64 = 0.05;
}

/// Tick cadence and stimulus intake.
pub mod scheduler {
    pub const MIN_TICK_MS: u64 = 50;
    pub const MAX_TICK_MS: u64 = 5_000;
    pub const REACTIVE_WINDOW_MS: u64 = 1_000;
    pub const REFLECTIVE_GROWTH: f64 = 1.0;
    pub const DEBOUNCE_WINDOW_MS: u64 = 100;
    pub const MAX_DEBOUNCE_WINDOW_MS: u64 = 60_000;
    pub const QUEUE_CAPACITY: usize = 1_024;
    pub const COMMAND_CAPACITY: usize = 64;
    pub const MAX_BATCH: usize = 256;
}

/// Stimulus entry resolution.
pub mod stimulus {
    pub const RESOLVE_THRESHOLD: f64 = 0.9;
    /// Bounds of the injection factor derived from ρ.
    pub const HEALTH_MIN: f64 = 0.5;
    pub const HEALTH_MAX: f64 = 1.5;
    /// Embedding entries inject into their best match only.
    pub const MAX_MATCHES: usize = 1;
}

/// Context reconstruction.
pub mod reconstruction {
    pub const MAX_HOPS: usize = 3;
    pub const ENERGY_BUDGET: f64 = 1.0;
    pub const SPREAD_FRACTION: f64 = 0.5;
    pub const MIN_ACTIVATION: f64 = 1e-4;
    pub const MAX_NODES: usize = 256;
    pub const PRIMING_SCALE: f64 = 0.1;
    /// Sensitivity of link weights to affect resonance with a cue.
    pub const RESONANCE: f64 = 0.6;
    pub const RESONANCE_MIN: f64 = 0.6;
    pub const RESONANCE_MAX: f64 = 1.6;
}
