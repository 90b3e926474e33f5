//! Context reconstruction.
//!
//! Context is never stored. It is recomputed by spreading a bounded budget of
//! activation from an entry node along the current, decayed link weights, so
//! the result drifts as the graph learns and forgets.

mod reconstruction;

pub use reconstruction::{
    reconstruct_context, reconstruct_with_affect, ReconstructedContext, ReconstructionParams,
};
