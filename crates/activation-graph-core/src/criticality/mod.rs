//! Criticality regulation.
//!
//! # Algorithm
//!
//! 1. Estimate ρ, the dominant eigenvalue of the gain operator
//!    `T = (1-δ)·[(1-α)·I + α·A]` on the active nodes, by power iteration
//!    (`estimator`). `A` holds the current learned link weights.
//! 2. Feed `ρ - target` into a PI controller with a clamped integral (`pid`).
//! 3. Map the control output onto α (down when supercritical) and δ_state
//!    (up when supercritical), clamped to configured bounds (`controller`).
//!
//! One loop runs globally; one more per entity channel trims that channel's
//! rates around the global values. Each loop owns its integral state.

mod controller;
mod estimator;
mod pid;

pub use controller::{
    CriticalityController, CriticalityLoop, CriticalitySnapshot, LoopDiagnostics, SafetyState,
};
pub use estimator::{estimate_spectral_radius, PowerIterationParams, SpectralEstimate};
pub use pid::PidController;
