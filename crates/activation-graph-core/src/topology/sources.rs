//! Link-creation evidence and the fused score.

use serde::{Deserialize, Serialize};

use crate::config::TopologyConfig;
use crate::types::{CreationReason, LinkType, NodeId};

/// One piece of evidence that two nodes belong together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkSource {
    /// Pearson correlation of windowed energy histories.
    Coactivation { correlation: f64 },
    /// Cosine similarity of embeddings.
    Semantic { similarity: f64 },
    /// A caller asked for the link directly.
    Explicit,
}

impl LinkSource {
    pub fn reason(&self) -> CreationReason {
        match self {
            Self::Coactivation { .. } => CreationReason::Coactivation,
            Self::Semantic { .. } => CreationReason::Semantic,
            Self::Explicit => CreationReason::Explicit,
        }
    }
}

/// Per-source weights of the fused score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceWeights {
    pub coactivation: f64,
    pub semantic: f64,
    pub explicit: f64,
}

impl From<&TopologyConfig> for SourceWeights {
    fn from(config: &TopologyConfig) -> Self {
        Self {
            coactivation: config.weight_coactivation,
            semantic: config.weight_semantic,
            explicit: config.weight_explicit,
        }
    }
}

/// `w_co·corr + w_sem·cos + w_explicit·[explicit]`.
///
/// Repeated evidence of one kind counts once, at its strongest value.
/// Negative correlations and similarities contribute nothing.
pub fn fuse_link_score(evidence: &[LinkSource], weights: &SourceWeights) -> f64 {
    let mut corr: f64 = 0.0;
    let mut sim: f64 = 0.0;
    let mut explicit = false;
    for source in evidence {
        match *source {
            LinkSource::Coactivation { correlation } if correlation.is_finite() => {
                corr = corr.max(correlation)
            }
            LinkSource::Semantic { similarity } if similarity.is_finite() => sim = sim.max(similarity),
            LinkSource::Explicit => explicit = true,
            _ => {}
        }
    }
    weights.coactivation * corr
        + weights.semantic * sim
        + if explicit { weights.explicit } else { 0.0 }
}

/// A candidate link with its accumulated evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkProposal {
    pub source: NodeId,
    pub target: NodeId,
    pub evidence: Vec<LinkSource>,
    pub score: f64,
}

impl LinkProposal {
    /// Coactivation takes precedence over semantic evidence.
    pub fn reason(&self) -> CreationReason {
        let has = |r: CreationReason| self.evidence.iter().any(|s| s.reason() == r);
        if has(CreationReason::Explicit) {
            CreationReason::Explicit
        } else if has(CreationReason::Coactivation) {
            CreationReason::Coactivation
        } else {
            CreationReason::Semantic
        }
    }

    pub fn link_type(&self) -> LinkType {
        match self.reason() {
            CreationReason::Semantic => LinkType::Semantic,
            _ => LinkType::Associative,
        }
    }

    /// Correlation or similarity behind the proposal, used as confidence.
    pub fn confidence(&self) -> f64 {
        self.evidence
            .iter()
            .map(|s| match *s {
                LinkSource::Coactivation { correlation } => correlation,
                LinkSource::Semantic { similarity } => similarity,
                LinkSource::Explicit => 1.0,
            })
            .fold(0.0_f64, f64::max)
            .clamp(0.0, 1.0)
    }
}
