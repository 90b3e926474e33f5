//! Structural learning: link creation and pruning.
//!
//! # Algorithm
//!
//! 1. Every tick, record each active node's total energy into a rolling
//!    window (`coactivation`).
//! 2. Every `coactivation_every_ticks`, correlate the windows of the top-k
//!    active nodes pairwise; every `semantic_every_ticks`, compare their
//!    embeddings. Both produce evidence for unlinked pairs.
//! 3. Evidence per pair is fused into one score (`sources`). Pairs above the
//!    creation threshold become probationary links, best score first, under
//!    a per-tick budget and a per-node cap on probationary out-links.
//! 4. Every `prune_every_ticks`, bring all weights up to date and remove
//!    links that never strengthened past probation (`evolver`).
//!
//! Explicit links bypass the score entirely and are created graduated.

mod coactivation;
mod evolver;
mod sources;

pub use coactivation::{pearson_correlation, CoactivationTracker};
pub use evolver::{ExplicitLink, TopologyEvolver, TopologyOutcome};
pub use sources::{fuse_link_score, LinkProposal, LinkSource, SourceWeights};
