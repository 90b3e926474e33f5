//! Entry resolution against the graph or a published directory.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};
use crate::graph::GraphStore;
use crate::types::{cosine_similarity, Embedding, NodeId};

use super::event::{NodeRef, StimulusEntry};

/// Outcome of resolving an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Existing(NodeId),
    /// No node is similar enough; a new node with this embedding is needed.
    Create(Embedding),
}

/// Read-only index of nodes, published for callers outside the tick task so
/// they can reject unresolvable stimuli before enqueueing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDirectory {
    keys: HashMap<String, NodeId>,
    embeddings: Vec<(NodeId, Embedding)>,
    node_count: usize,
    embedding_dim: Option<usize>,
}

impl NodeDirectory {
    pub fn from_store(store: &GraphStore) -> Self {
        Self {
            keys: store.nodes().map(|n| (n.key.clone(), n.id)).collect(),
            embeddings: store
                .nodes()
                .filter(|n| n.has_embedding())
                .map(|n| (n.id, n.embedding.clone()))
                .collect(),
            node_count: store.node_count(),
            embedding_dim: store.embedding_dim(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn lookup(&self, node: &NodeRef) -> Option<NodeId> {
        match node {
            NodeRef::Id(id) => (id.index() < self.node_count).then_some(*id),
            NodeRef::Key(key) => self.keys.get(key).copied(),
        }
    }

    /// Resolve with the same rules as [`resolve_entry`].
    ///
    /// # Errors
    /// - `InvalidReference` if the entry cannot name an existing or creatable node
    pub fn resolve(
        &self,
        entry: &StimulusEntry,
        threshold: f64,
        create_on_miss: bool,
    ) -> EngineResult<Resolution> {
        match entry {
            StimulusEntry::Node(node) => self
                .lookup(node)
                .map(Resolution::Existing)
                .ok_or_else(|| EngineError::InvalidReference(format!("unknown node {}", node))),
            StimulusEntry::Embedding(e) => by_embedding(
                self.embeddings.iter().map(|(id, v)| (*id, v.as_slice())),
                self.embedding_dim,
                e,
                threshold,
                create_on_miss,
            ),
        }
    }
}

/// Resolve an entry against the live graph.
///
/// Node references must exist. Embeddings resolve to the most cosine-similar
/// node at or above `threshold` (ties go to the lower id); below it a new
/// node is requested when `create_on_miss` is set.
///
/// # Errors
/// - `InvalidReference` if the entry cannot name an existing or creatable node
pub fn resolve_entry(
    store: &GraphStore,
    entry: &StimulusEntry,
    threshold: f64,
    create_on_miss: bool,
) -> EngineResult<Resolution> {
    match entry {
        StimulusEntry::Node(NodeRef::Id(id)) => store
            .node(*id)
            .map(|_| Resolution::Existing(*id))
            .map_err(|_| EngineError::InvalidReference(format!("unknown node {}", id))),
        StimulusEntry::Node(NodeRef::Key(key)) => store
            .node_by_key(key)
            .map(Resolution::Existing)
            .map_err(|_| EngineError::InvalidReference(format!("unknown node key '{}'", key))),
        StimulusEntry::Embedding(e) => by_embedding(
            store
                .nodes()
                .filter(|n| n.has_embedding())
                .map(|n| (n.id, n.embedding.as_slice())),
            store.embedding_dim(),
            e,
            threshold,
            create_on_miss,
        ),
    }
}

/// Up to `k` nodes with cosine similarity at or above `threshold`, most
/// similar first (ties go to the lower id).
pub fn best_matches(
    store: &GraphStore,
    embedding: &[f32],
    threshold: f64,
    k: usize,
) -> Vec<(NodeId, f64)> {
    let mut matches: Vec<(NodeId, f64)> = store
        .nodes()
        .filter(|n| n.has_embedding() && n.embedding.len() == embedding.len())
        .map(|n| (n.id, cosine_similarity(&n.embedding, embedding) as f64))
        .filter(|(_, sim)| *sim >= threshold)
        .collect();
    matches.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    matches.truncate(k);
    matches
}

fn by_embedding<'a>(
    candidates: impl Iterator<Item = (NodeId, &'a [f32])>,
    dim: Option<usize>,
    embedding: &[f32],
    threshold: f64,
    create_on_miss: bool,
) -> EngineResult<Resolution> {
    if let Some(dim) = dim {
        if embedding.len() != dim {
            return Err(EngineError::InvalidReference(format!(
                "embedding has dimension {}, graph uses {}",
                embedding.len(),
                dim
            )));
        }
    }
    let best = candidates
        .map(|(id, v)| (id, cosine_similarity(v, embedding) as f64))
        .fold(None::<(NodeId, f64)>, |best, (id, sim)| match best {
            Some((_, b)) if b >= sim => best,
            _ => Some((id, sim)),
        });
    match best {
        Some((id, sim)) if sim >= threshold => Ok(Resolution::Existing(id)),
        _ if create_on_miss => Ok(Resolution::Create(embedding.to_vec())),
        _ => Err(EngineError::InvalidReference(format!(
            "no node within similarity {} of the embedding",
            threshold
        ))),
    }
}
