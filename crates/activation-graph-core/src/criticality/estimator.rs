//! Power-iteration estimate of the spectral radius on a node subset.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dynamics::ChannelRates;
use crate::graph::GraphStore;
use crate::types::NodeId;

#[derive(Debug, Clone, Copy)]
pub struct PowerIterationParams {
    pub max_iterations: usize,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralEstimate {
    pub rho: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Number of nodes in the restricted operator.
    pub dimension: usize,
}

/// Estimate ρ of `(1-δ)·[(1-α)·I + α·A]` restricted to `nodes`.
///
/// Only links with both ends in `nodes` contribute. The operator is
/// non-negative and the identity shift makes it aperiodic, so iteration from
/// the uniform vector converges to the Perron root. Returns `None` for an
/// empty node set or a non-finite iterate.
pub fn estimate_spectral_radius(
    store: &GraphStore,
    nodes: &[NodeId],
    rates: ChannelRates,
    params: PowerIterationParams,
) -> Option<SpectralEstimate> {
    let n = nodes.len();
    if n == 0 {
        return None;
    }

    let index: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let mut edges: Vec<(usize, usize, f64)> = Vec::new();
    for (i, id) in nodes.iter().enumerate() {
        for link in store.out_links(*id) {
            if let Some(&j) = index.get(&link.target) {
                if link.weight > 0.0 && link.weight.is_finite() {
                    edges.push((i, j, link.weight));
                }
            }
        }
    }

    let keep = 1.0 - rates.state_decay;
    let stay = 1.0 - rates.alpha;
    let mut x = vec![1.0 / (n as f64).sqrt(); n];
    let mut y = vec![0.0; n];
    let mut rho = 0.0;

    for iteration in 1..=params.max_iterations {
        for (yi, xi) in y.iter_mut().zip(&x) {
            *yi = stay * xi;
        }
        for &(i, j, w) in &edges {
            y[j] += rates.alpha * w * x[i];
        }
        let mut norm = 0.0;
        for yi in y.iter_mut() {
            *yi *= keep;
            norm += *yi * *yi;
        }
        let norm = norm.sqrt();

        if !norm.is_finite() {
            return None;
        }
        if norm <= f64::MIN_POSITIVE {
            // Everything decays to nothing in one step.
            return Some(SpectralEstimate {
                rho: 0.0,
                iterations: iteration,
                converged: true,
                dimension: n,
            });
        }

        let previous = rho;
        rho = norm;
        for (xi, yi) in x.iter_mut().zip(&y) {
            *xi = yi / norm;
        }
        if iteration > 1 && (rho - previous).abs() <= params.tolerance * rho.max(1.0) {
            return Some(SpectralEstimate {
                rho,
                iterations: iteration,
                converged: true,
                dimension: n,
            });
        }
    }

    Some(SpectralEstimate {
        rho,
        iterations: params.max_iterations,
        converged: false,
        dimension: n,
    })
}
