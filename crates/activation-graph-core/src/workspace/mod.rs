//! Global workspace selection.
//!
//! ## Algorithm
//!
//! 1. Score every emerged cluster: `criticality_term × goal_similarity`
//!    (`candidate`).
//! 2. Size the budget from the task complexity and the number of active
//!    entities (`capacity`).
//! 3. Adjust scores for stickiness (incumbent bonus, challenger penalty).
//!    The admission floor, which scales with the systemic ρ, is applied to
//!    the adjusted score, so incumbents leave below `floor / (1 + bonus)`
//!    and challengers enter above `floor / (1 - penalty)`.
//! 4. Admit greedily by `adjusted / cost` until the budget is used
//!    (`selector`).
//! 5. After any membership change, freeze admissions and voluntary
//!    evictions for the dwell period.
//!
//! ## Module Structure
//!
//! - `candidate` - scoring of emerged clusters
//! - `capacity` - adaptive budget
//! - `selector` - budgeted, sticky selection and the published `Workspace`

mod candidate;
mod capacity;
mod selector;

pub use candidate::{
    admission_floor, criticality_term, goal_similarity, score_candidates, ScoringContext,
    WorkspaceCandidate,
};
pub use capacity::adaptive_capacity;
pub use selector::{SelectionOutcome, SlotRole, Workspace, WorkspaceEntry, WorkspaceSelector};
