//! Entity cluster detection.
//!
//! # Algorithm
//!
//! 1. Assign every active node to its dominant channel if that channel's
//!    energy exceeds the activity floor.
//! 2. Per channel, take connected components (links in either direction)
//!    with at least two nodes. A single node can never become a cluster.
//! 3. Score each component: `S = energy × density × boundary × tightness`.
//! 4. Compare against a relative threshold `τ` (EMA of `median + 2·stdev`,
//!    floored), entering above `1.1·τ` and leaving below `0.9·τ`.
//! 5. Cap the number of simultaneously emerged clusters.
//!
//! Clusters are never written back to the graph.

mod cluster;
mod detector;
mod threshold;

#[cfg(test)]
mod tests;

pub use cluster::{
    find_candidates, jaccard, CandidateCluster, ClusterLifecycle, Coherence, EntityCluster,
};
pub use detector::{DetectionOutcome, EntityDetector};
pub use threshold::{relative_threshold, EmergenceThreshold, ThresholdReading};
