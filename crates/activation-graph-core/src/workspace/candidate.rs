//! Scoring of emerged clusters against the goal and the criticality state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityCluster;
use crate::types::{cosine_similarity, ClusterId, Embedding, EntityId, NodeId};

/// An emerged cluster competing for the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceCandidate {
    pub cluster_id: ClusterId,
    pub entity: EntityId,
    pub nodes: Vec<NodeId>,
    pub embedding: Option<Embedding>,
    pub energy: f64,
    pub coherence: f64,
    pub cost: f64,
    pub criticality_term: f64,
    pub goal_similarity: f64,
    /// `criticality_term × goal_similarity`.
    pub score: f64,
}

impl WorkspaceCandidate {
    /// Candidate with a precomputed score; used by callers that bring their
    /// own scoring.
    pub fn with_score(cluster_id: ClusterId, nodes: Vec<NodeId>, cost: f64, score: f64) -> Self {
        Self {
            cluster_id,
            entity: EntityId::DEFAULT,
            nodes,
            embedding: None,
            energy: 0.0,
            coherence: 1.0,
            cost,
            criticality_term: score,
            goal_similarity: 1.0,
            score,
        }
    }
}

/// Systemic state the scores are relative to.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub goal: &'a [f32],
    pub global_rho: Option<f64>,
    pub entity_rho: &'a BTreeMap<EntityId, f64>,
    pub target: f64,
}

/// `S / (S + mean_S) × 1 / (1 + |ρ_e − target|)`.
///
/// The first factor ranks a cluster against its peers; the second favors
/// channels that are themselves near the critical point.
pub fn criticality_term(score: f64, mean_score: f64, rho: Option<f64>, target: f64) -> f64 {
    let relative = if score + mean_score > 0.0 {
        score / (score + mean_score)
    } else {
        0.0
    };
    let closeness = rho.map_or(1.0, |r| 1.0 / (1.0 + (r - target).abs()));
    let term = relative * closeness;
    if term.is_finite() {
        term
    } else {
        0.0
    }
}

/// `(cos + 1) / 2`, or a neutral 0.5 when either side has no embedding.
pub fn goal_similarity(embedding: Option<&[f32]>, goal: &[f32]) -> f64 {
    match embedding {
        Some(e) if !e.is_empty() && !goal.is_empty() && e.len() == goal.len() => {
            (cosine_similarity(e, goal) as f64 + 1.0) / 2.0
        }
        _ => 0.5,
    }
}

/// Minimum admissible score: the configured floor, raised when the network
/// is supercritical and lowered when it is subcritical.
pub fn admission_floor(min_score: f64, global_rho: Option<f64>, target: f64) -> f64 {
    let arousal = match global_rho {
        Some(r) if target > 0.0 && r.is_finite() => (r / target).clamp(0.5, 2.0),
        _ => 1.0,
    };
    min_score * arousal
}

/// Score the emerged clusters, highest first.
pub fn score_candidates<'a, I>(clusters: I, context: &ScoringContext<'_>) -> Vec<WorkspaceCandidate>
where
    I: IntoIterator<Item = &'a EntityCluster>,
{
    let clusters: Vec<&EntityCluster> = clusters
        .into_iter()
        .filter(|c| c.lifecycle.is_emerged() && c.len() >= 2)
        .collect();
    if clusters.is_empty() {
        return Vec::new();
    }
    let mean = clusters.iter().map(|c| c.score).sum::<f64>() / clusters.len() as f64;

    let mut scored: Vec<WorkspaceCandidate> = clusters
        .into_iter()
        .map(|c| {
            let rho = context.entity_rho.get(&c.entity).copied().or(context.global_rho);
            let crit = criticality_term(c.score, mean, rho, context.target);
            let sim = goal_similarity(c.embedding.as_deref(), context.goal);
            WorkspaceCandidate {
                cluster_id: c.id,
                entity: c.entity,
                nodes: c.nodes.clone(),
                embedding: c.embedding.clone(),
                energy: c.energy,
                coherence: c.coherence.value(),
                cost: c.cost,
                criticality_term: crit,
                goal_similarity: sim,
                score: crit * sim,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.cluster_id.cmp(&b.cluster_id)));
    scored
}
