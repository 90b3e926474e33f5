//! Rolling energy histories and pairwise correlation.

use std::collections::{HashMap, VecDeque};

use crate::graph::{Frontier, GraphStore};
use crate::types::NodeId;

/// Pearson correlation of two equally long series.
///
/// Returns `None` for fewer than two samples, mismatched lengths, or a
/// constant series (zero variance).
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len();
    if n < 2 || n != b.len() {
        return None;
    }
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON || !denom.is_finite() {
        return None;
    }
    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Windowed total-energy history of every active node.
///
/// Histories are appended once per tick for active nodes and dropped as soon
/// as a node leaves the active set, so two histories always end on the same
/// tick and their common tail is time-aligned.
#[derive(Debug, Clone)]
pub struct CoactivationTracker {
    window: usize,
    histories: HashMap<NodeId, VecDeque<f64>>,
}

impl CoactivationTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            histories: HashMap::new(),
        }
    }

    /// Append this tick's energies for the frontier's active nodes.
    pub fn record(&mut self, store: &GraphStore, frontier: &Frontier) {
        self.histories.retain(|id, _| frontier.is_active(*id));
        for id in frontier.active() {
            let Ok(node) = store.node(*id) else {
                continue;
            };
            let history = self
                .histories
                .entry(*id)
                .or_insert_with(|| VecDeque::with_capacity(self.window));
            if history.len() == self.window {
                history.pop_front();
            }
            history.push_back(node.total_energy());
        }
    }

    pub fn samples(&self, id: NodeId) -> usize {
        self.histories.get(&id).map_or(0, VecDeque::len)
    }

    pub fn mean(&self, id: NodeId) -> Option<f64> {
        let h = self.histories.get(&id)?;
        if h.is_empty() {
            return None;
        }
        Some(h.iter().sum::<f64>() / h.len() as f64)
    }

    pub fn tracked(&self) -> usize {
        self.histories.len()
    }

    /// Correlation over the common tail of two histories.
    pub fn correlation(&self, a: NodeId, b: NodeId) -> Option<f64> {
        let ha = self.histories.get(&a)?;
        let hb = self.histories.get(&b)?;
        let n = ha.len().min(hb.len());
        let xa: Vec<f64> = ha.iter().skip(ha.len() - n).copied().collect();
        let xb: Vec<f64> = hb.iter().skip(hb.len() - n).copied().collect();
        pearson_correlation(&xa, &xb)
    }

    /// Unlinked pairs among the `top_k` highest-mean nodes whose correlation
    /// reaches `min_correlation`. Pairs are `(higher mean, lower mean, r)`.
    pub fn correlated_pairs(
        &self,
        store: &GraphStore,
        top_k: usize,
        min_samples: usize,
        min_correlation: f64,
    ) -> Vec<(NodeId, NodeId, f64)> {
        let mut ranked: Vec<(NodeId, f64)> = self
            .histories
            .iter()
            .filter(|(_, h)| h.len() >= min_samples)
            .filter_map(|(id, _)| self.mean(*id).map(|m| (*id, m)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(top_k);

        let mut pairs = Vec::new();
        for (i, (a, _)) in ranked.iter().enumerate() {
            for (b, _) in &ranked[i + 1..] {
                if store.are_linked(*a, *b) {
                    continue;
                }
                if let Some(r) = self.correlation(*a, *b) {
                    if r >= min_correlation {
                        pairs.push((*a, *b, r));
                    }
                }
            }
        }
        pairs
    }

    pub fn clear(&mut self) {
        self.histories.clear();
    }
}
