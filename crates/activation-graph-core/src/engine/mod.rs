//! Engine orchestration.
//!
//! [`Engine`] owns the working graph and every component's cross-tick state
//! and runs them in a fixed order each tick:
//!
//! 1. frontier (energized nodes above the activity floor)
//! 2. lazy weight decay of the links about to be read
//! 3. diffusion + state decay from the pre-tick snapshot, swapped in whole
//! 4. Hebbian reinforcement of traversed links
//! 5. spectral radius estimate and PI update of α/δ
//! 6. topology evolution (coactivation, semantic, pruning)
//! 7. entity cluster detection
//! 8. goal stack evaluation
//! 9. workspace selection under the adaptive budget
//!
//! The order is the same on every tick, which keeps runs reproducible even
//! though step 3 is computed in parallel.
//!
//! ## Module Structure
//!
//! - `pipeline`: the engine, its request types and the tick sub-order
//! - `report`: per-tick [`TickReport`]
//! - `metrics`: cumulative [`EngineMetrics`]
//! - `stability`: [`StabilityMonitor`] for clamped numeric violations
//! - `view`: the published read-only [`EngineView`]

mod metrics;
mod pipeline;
mod report;
mod stability;
mod view;


pub use metrics::EngineMetrics;
pub use pipeline::{AppliedStimulus, Engine, Highway, NodeRequest};
pub use report::{GoalReport, TickReport, WorkspaceReport};
pub use stability::{StabilityCounts, StabilityMonitor};
pub use view::EngineView;
