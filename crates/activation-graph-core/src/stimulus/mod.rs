//! External stimuli: the only driver of tick-rate acceleration.
//!
//! ## Module Structure
//!
//! - `budget` - ρ-dependent injection factor and its split over matches
//! - `event` - the stimulus value and its validation
//! - `coalesce` - merging of near-duplicate stimuli within a debounce window,
//!   within one batch and across batches
//! - `resolve` - mapping an entry (id, key or embedding) onto a node

mod budget;
mod coalesce;
mod event;
mod resolve;

pub use budget::{health_factor, split_budget};
pub use coalesce::{coalesce, CoalescedBatch, Debouncer};
pub use event::{NodeRef, Stimulus, StimulusEntry};
pub use resolve::{best_matches, resolve_entry, NodeDirectory, Resolution};
