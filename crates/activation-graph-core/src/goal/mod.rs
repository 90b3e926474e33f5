//! Goal selection.
//!
//! Workspace selection needs a goal, and the natural goal is the workspace's
//! own content. The loop is broken by a strict priority stack of sources:
//!
//! | Source    | Present when                              | Weight |
//! |-----------|-------------------------------------------|--------|
//! | External  | a caller set a task goal                  | 1.0    |
//! | Scheduled | a registered window covers the tick       | 0.8    |
//! | Emergent  | the workspace is non-empty                | 0.6    |
//! | Stimulus  | the workspace is empty and a stimulus is pending | 0.4 |
//! | Default   | always                                    | 0.1    |
//!
//! A non-external change needs a score margin and a minimum dwell.

mod manager;
mod source;

pub use manager::{GoalContext, GoalManager, GoalUpdate};
pub use source::{Goal, GoalSource, ScheduledGoal};
