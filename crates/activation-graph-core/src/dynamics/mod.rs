//! Per-tick energy dynamics.
//!
//! # Algorithm
//!
//! 1. Lazy weight decay brings every link that may carry energy up to the
//!    current engine clock (`decay`).
//! 2. Each energized node pushes a fraction of every channel along its
//!    normalized out-links, computed from a pre-tick snapshot and written to
//!    a fresh buffer (`diffusion`).
//! 3. State decay is applied to the buffer, negatives are clamped.
//! 4. Traversals above epsilon strengthen their links toward `w_max`
//!    (`learning`).
//! 5. In- and out-links of the post-pass energized set are brought up to the
//!    clock, so criticality and cluster measurement read current weights.

pub mod decay;
pub mod diffusion;
pub mod learning;

pub use decay::{
    decay_factor, decay_link_weight, decay_links, decayed_weight, energized_links,
    energized_out_links,
};
pub use diffusion::{
    diffuse, effective_fraction, ChannelRates, DiffusionOutcome, DiffusionParams, RateTable,
    Traversal,
};
pub use learning::{apply_traversals, hebbian_gain, reinforce, LearningOutcome};
