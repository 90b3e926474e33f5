//! Candidate clusters: connected co-active nodes sharing a dominant channel.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::graph::{Frontier, GraphStore};
use crate::types::{cosine_similarity, weighted_centroid, ClusterId, Embedding, EntityId, NodeId};

/// Lifecycle of a tracked cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLifecycle {
    /// Present as a candidate but below the entry threshold.
    Dormant,
    /// Crossed the entry threshold this tick.
    Emerging,
    /// Emerged earlier and still above the exit threshold.
    Active,
    /// Fell below the exit threshold or lost its component; reported once.
    Dissolving,
}

impl ClusterLifecycle {
    pub fn is_emerged(self) -> bool {
        matches!(self, Self::Emerging | Self::Active)
    }
}

/// Components of the coherence score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coherence {
    /// Linked unordered pairs over all unordered pairs.
    pub density: f64,
    /// Internal link weight over internal plus boundary link weight.
    pub boundary: f64,
    /// Mean pairwise `(cos + 1) / 2` of member embeddings.
    pub tightness: f64,
}

impl Coherence {
    pub fn value(&self) -> f64 {
        self.density * self.boundary * self.tightness
    }
}

/// A connected component of one channel, before hysteresis.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCluster {
    pub entity: EntityId,
    /// Sorted, at least two.
    pub nodes: Vec<NodeId>,
    pub energy: f64,
    pub coherence: Coherence,
    /// `energy × coherence`.
    pub score: f64,
    pub embedding: Option<Embedding>,
}

/// A cluster as reported to the workspace and to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCluster {
    pub id: ClusterId,
    pub entity: EntityId,
    pub nodes: Vec<NodeId>,
    pub energy: f64,
    pub coherence: Coherence,
    pub score: f64,
    pub lifecycle: ClusterLifecycle,
    /// Energy-weighted centroid of member embeddings.
    pub embedding: Option<Embedding>,
    /// Representation cost (node count × cost per node).
    pub cost: f64,
    pub first_seen_tick: u64,
    pub emerged_tick: Option<u64>,
}

impl EntityCluster {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.binary_search(&id).is_ok()
    }
}

/// Jaccard overlap of two sorted node lists.
pub fn jaccard(a: &[NodeId], b: &[NodeId]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let (mut i, mut j, mut shared) = (0, 0, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared as f64 / (a.len() + b.len() - shared) as f64
}

/// Every candidate cluster on the frontier, ordered by channel then first node.
///
/// Each active node joins the channel holding most of its energy, provided
/// that energy exceeds the frontier floor. Components are taken over links
/// in either direction; components of one node are discarded.
pub fn find_candidates(store: &GraphStore, frontier: &Frontier) -> Vec<CandidateCluster> {
    let mut by_entity: BTreeMap<EntityId, BTreeSet<NodeId>> = BTreeMap::new();
    for id in frontier.active() {
        let Ok(node) = store.node(*id) else {
            continue;
        };
        if let Some((entity, energy)) = node.dominant_entity() {
            if energy > frontier.floor() {
                by_entity.entry(entity).or_default().insert(*id);
            }
        }
    }

    let mut candidates = Vec::new();
    for (entity, members) in by_entity {
        for component in components(store, &members) {
            if component.len() < 2 {
                continue;
            }
            candidates.push(measure(store, entity, component));
        }
    }
    candidates
}

fn components(store: &GraphStore, members: &BTreeSet<NodeId>) -> Vec<Vec<NodeId>> {
    let mut seen: HashSet<NodeId> = HashSet::with_capacity(members.len());
    let mut out = Vec::new();
    for start in members {
        if !seen.insert(*start) {
            continue;
        }
        let mut component = vec![*start];
        let mut queue = VecDeque::from([*start]);
        while let Some(id) = queue.pop_front() {
            let neighbors = store
                .out_links(id)
                .map(|l| l.target)
                .chain(store.in_links(id).map(|l| l.source));
            for next in neighbors {
                if members.contains(&next) && seen.insert(next) {
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        component.sort_unstable();
        out.push(component);
    }
    out
}

fn measure(store: &GraphStore, entity: EntityId, nodes: Vec<NodeId>) -> CandidateCluster {
    let member: HashSet<NodeId> = nodes.iter().copied().collect();
    let mut linked_pairs: HashSet<(NodeId, NodeId)> = HashSet::new();
    let (mut internal, mut boundary) = (0.0, 0.0);

    for id in &nodes {
        for link in store.out_links(*id) {
            if member.contains(&link.target) {
                internal += link.weight;
                let pair = if link.source < link.target {
                    (link.source, link.target)
                } else {
                    (link.target, link.source)
                };
                linked_pairs.insert(pair);
            } else {
                boundary += link.weight;
            }
        }
        boundary += store
            .in_links(*id)
            .filter(|l| !member.contains(&l.source))
            .map(|l| l.weight)
            .sum::<f64>();
    }

    let n = nodes.len() as f64;
    let density = (linked_pairs.len() as f64 / (n * (n - 1.0) / 2.0)).min(1.0);
    let boundary_sparsity = if internal + boundary > 0.0 {
        internal / (internal + boundary)
    } else {
        1.0
    };

    let members: Vec<(&[f32], f64)> = nodes
        .iter()
        .filter_map(|id| store.node(*id).ok())
        .map(|n| (n.embedding.as_slice(), n.energy(entity)))
        .collect();
    let energy: f64 = members.iter().map(|(_, e)| *e).sum();
    let tightness = tightness(members.iter().map(|(v, _)| *v).filter(|v| !v.is_empty()));
    let coherence = Coherence {
        density,
        boundary: boundary_sparsity,
        tightness,
    };

    CandidateCluster {
        entity,
        embedding: weighted_centroid(members.iter().copied()),
        energy,
        score: energy * coherence.value(),
        coherence,
        nodes,
    }
}

fn tightness<'a>(embeddings: impl Iterator<Item = &'a [f32]>) -> f64 {
    let embeddings: Vec<&[f32]> = embeddings.collect();
    if embeddings.len() < 2 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for (i, a) in embeddings.iter().enumerate() {
        for b in &embeddings[i + 1..] {
            sum += (cosine_similarity(a, b) as f64 + 1.0) / 2.0;
            pairs += 1;
        }
    }
    sum / pairs as f64
}
