//! Adaptive tick scheduler.
//!
//! One tokio task owns the [`Engine`](crate::engine::Engine) and is the only
//! writer of its state. Callers talk to it through an [`EngineHandle`]:
//! stimuli go through a bounded queue, every other mutation is a command
//! with a oneshot reply, and reads come from a view republished after each
//! tick or applied batch.
//!
//! Ticks never overlap. A stimulus arriving during a long dormant wait
//! preempts the wait: it is applied at once and the next tick is pulled in
//! to `min_tick`.
//!
//! ## Module Structure
//!
//! - `cadence` - interval curve and integration step
//! - `runtime` - the owning task and its select loop
//! - `handle` - the cloneable caller interface

mod cadence;
mod handle;
mod runtime;

use serde::{Deserialize, Serialize};

pub use cadence::{Cadence, CadenceRegime};
pub use handle::EngineHandle;
pub use runtime::Scheduler;

/// What the scheduler task is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Waiting for the next tick, a stimulus or a command.
    #[default]
    IdleWait,
    ProcessingStimulus,
    ExecutingTick,
    /// The task has exited.
    Stopped,
}
