//! Arena-backed graph store.
//!
//! Nodes live in a `Vec` and are never removed; links live in recycled slots
//! with a generation counter. Adjacency is kept per node in both directions,
//! so out/in iteration is O(degree). The set of energized nodes is maintained
//! on every energy write, which lets the tick walk the active frontier without
//! scanning the whole arena.
//!
//! The store has no behavior beyond storage: it never decays, diffuses or
//! learns. Lookups of unknown ids return `NotFound`-style errors.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{EngineError, EngineResult};
use crate::types::{CreationReason, Embedding, EntityId, Link, LinkId, LinkType, Node, NodeId};

/// Parameters for a node insert.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub key: String,
    pub node_type: String,
    pub embedding: Embedding,
    pub base_weight: f64,
    pub created_tick: u64,
}

/// Parameters for a link insert. Endpoints must already exist.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub source: NodeId,
    pub target: NodeId,
    pub link_type: LinkType,
    pub weight: f64,
    pub affect: Option<Embedding>,
    pub creation_reason: CreationReason,
    pub confidence: f64,
    pub created_tick: u64,
    pub graduated: bool,
    /// Engine clock at creation (start of lazy weight decay).
    pub clock: f64,
}

#[derive(Debug, Clone, Default)]
struct LinkSlot {
    generation: u32,
    link: Option<Link>,
}

/// Owner of all nodes and links.
#[derive(Debug, Clone)]
pub struct GraphStore {
    nodes: Vec<Node>,
    keys: HashMap<String, NodeId>,
    slots: Vec<LinkSlot>,
    free_slots: Vec<u32>,
    outgoing: Vec<Vec<LinkId>>,
    incoming: Vec<Vec<LinkId>>,
    triples: HashMap<(NodeId, NodeId, LinkType), LinkId>,
    energized: BTreeSet<NodeId>,
    link_count: usize,
    embedding_dim: Option<usize>,
    w_max: f64,
}

impl GraphStore {
    /// Empty store whose links must stay strictly below `w_max`.
    pub fn new(w_max: f64) -> Self {
        Self {
            nodes: Vec::new(),
            keys: HashMap::new(),
            slots: Vec::new(),
            free_slots: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            triples: HashMap::new(),
            energized: BTreeSet::new(),
            link_count: 0,
            embedding_dim: None,
            w_max,
        }
    }

    pub fn w_max(&self) -> f64 {
        self.w_max
    }

    // ========== Nodes ==========

    /// Insert a node.
    ///
    /// # Errors
    /// - `DuplicateNode` if the key is taken
    /// - `Validation` for an empty key, a non-finite embedding, or an
    ///   embedding whose dimension differs from earlier nodes
    pub fn add_node(&mut self, new: NewNode) -> EngineResult<NodeId> {
        if new.key.is_empty() {
            return Err(EngineError::validation("key", "node key must not be empty"));
        }
        if self.keys.contains_key(&new.key) {
            return Err(EngineError::DuplicateNode(new.key));
        }
        if !new.base_weight.is_finite() || new.base_weight < 0.0 {
            return Err(EngineError::validation(
                "base_weight",
                format!("must be finite and >= 0, got {}", new.base_weight),
            ));
        }
        self.check_embedding(&new.embedding)?;

        let id = NodeId(u32::try_from(self.nodes.len()).map_err(|_| {
            EngineError::validation("node", "node arena exhausted (u32 index space)")
        })?);
        if !new.embedding.is_empty() && self.embedding_dim.is_none() {
            self.embedding_dim = Some(new.embedding.len());
        }
        self.keys.insert(new.key.clone(), id);
        self.nodes.push(Node::new(
            id,
            new.key,
            new.node_type,
            new.embedding,
            new.base_weight,
            new.created_tick,
        ));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        Ok(id)
    }

    /// Validate an embedding against the established dimension.
    pub fn check_embedding(&self, embedding: &[f32]) -> EngineResult<()> {
        if embedding.is_empty() {
            return Ok(());
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::validation("embedding", "contains non-finite values"));
        }
        match self.embedding_dim {
            Some(dim) if dim != embedding.len() => Err(EngineError::validation(
                "embedding",
                format!("dimension mismatch: expected {}, got {}", dim, embedding.len()),
            )),
            _ => Ok(()),
        }
    }

    pub fn embedding_dim(&self) -> Option<usize> {
        self.embedding_dim
    }

    pub fn node(&self, id: NodeId) -> EngineResult<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| EngineError::NodeNotFound(id.to_string()))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> EngineResult<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| EngineError::NodeNotFound(id.to_string()))
    }

    pub fn node_by_key(&self, key: &str) -> EngineResult<NodeId> {
        self.keys
            .get(key)
            .copied()
            .ok_or_else(|| EngineError::NodeNotFound(key.to_string()))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    // ========== Links ==========

    /// Insert a link.
    ///
    /// # Errors
    /// - `NodeNotFound` if either endpoint is unknown
    /// - `DuplicateLink` if the (source, target, type) triple exists
    /// - `Validation` for self-loops, or a weight outside `[0, w_max)`
    pub fn add_link(&mut self, new: NewLink) -> EngineResult<LinkId> {
        self.node(new.source)?;
        self.node(new.target)?;
        if new.source == new.target {
            return Err(EngineError::validation(
                "target",
                format!("self-loop on {} is not allowed", new.source),
            ));
        }
        if !new.weight.is_finite() || new.weight < 0.0 || new.weight >= self.w_max {
            return Err(EngineError::validation(
                "weight",
                format!("must be in [0, {}), got {}", self.w_max, new.weight),
            ));
        }
        if !new.confidence.is_finite() || !(0.0..=1.0).contains(&new.confidence) {
            return Err(EngineError::validation(
                "confidence",
                format!("must be in [0, 1], got {}", new.confidence),
            ));
        }
        let triple = (new.source, new.target, new.link_type);
        if let Some(existing) = self.triples.get(&triple) {
            return Err(EngineError::DuplicateLink {
                from: new.source,
                to: new.target,
                link_type: new.link_type,
                existing: *existing,
            });
        }

        let id = match self.free_slots.pop() {
            Some(index) => LinkId::new(index, self.slots[index as usize].generation),
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| {
                    EngineError::validation("link", "link arena exhausted (u32 index space)")
                })?;
                self.slots.push(LinkSlot::default());
                LinkId::new(index, 0)
            }
        };

        let link = Link {
            id,
            source: new.source,
            target: new.target,
            link_type: new.link_type,
            weight: new.weight,
            affect: new.affect,
            creation_reason: new.creation_reason,
            confidence: new.confidence,
            created_tick: new.created_tick,
            last_traversed_tick: None,
            probation_start_tick: new.created_tick,
            graduated: new.graduated,
            decay_clock: new.clock,
        };
        self.slots[id.index as usize].link = Some(link);
        self.outgoing[new.source.index()].push(id);
        self.incoming[new.target.index()].push(id);
        self.triples.insert(triple, id);
        self.link_count += 1;
        Ok(id)
    }

    pub fn link(&self, id: LinkId) -> EngineResult<&Link> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.link.as_ref())
            .ok_or(EngineError::LinkNotFound(id))
    }

    pub(crate) fn link_mut(&mut self, id: LinkId) -> EngineResult<&mut Link> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.link.as_mut())
            .ok_or(EngineError::LinkNotFound(id))
    }

    /// Remove a link and free its slot for reuse under a new generation.
    pub fn remove_link(&mut self, id: LinkId) -> EngineResult<Link> {
        self.link(id)?;
        let slot = &mut self.slots[id.index as usize];
        let link = slot.link.take().ok_or(EngineError::LinkNotFound(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index);

        self.outgoing[link.source.index()].retain(|l| *l != id);
        self.incoming[link.target.index()].retain(|l| *l != id);
        self.triples
            .remove(&(link.source, link.target, link.link_type));
        self.link_count -= 1;
        Ok(link)
    }

    /// Link id for an exact (source, target, type) triple.
    pub fn find_link(&self, source: NodeId, target: NodeId, link_type: LinkType) -> Option<LinkId> {
        self.triples.get(&(source, target, link_type)).copied()
    }

    /// Whether any link, of any type, joins `a` and `b` in either direction.
    pub fn are_linked(&self, a: NodeId, b: NodeId) -> bool {
        let Some(out) = self.outgoing.get(a.index()) else {
            return false;
        };
        let Some(inc) = self.incoming.get(a.index()) else {
            return false;
        };
        out.iter()
            .chain(inc.iter())
            .filter_map(|id| self.link(*id).ok())
            .any(|l| l.connects(a, b))
    }

    /// Out-link ids of a node (empty for unknown ids).
    pub fn outgoing(&self, id: NodeId) -> &[LinkId] {
        self.outgoing
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// In-link ids of a node (empty for unknown ids).
    pub fn incoming(&self, id: NodeId) -> &[LinkId] {
        self.incoming
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Live out-links of a node.
    pub fn out_links(&self, id: NodeId) -> impl Iterator<Item = &Link> {
        self.outgoing(id).iter().filter_map(|l| self.link(*l).ok())
    }

    /// Live in-links of a node.
    pub fn in_links(&self, id: NodeId) -> impl Iterator<Item = &Link> {
        self.incoming(id).iter().filter_map(|l| self.link(*l).ok())
    }

    /// Neighbors over links in either direction, deduplicated and ordered.
    pub fn neighbors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.out_links(id)
            .map(|l| l.target)
            .chain(self.in_links(id).map(|l| l.source))
            .collect()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.slots.iter().filter_map(|slot| slot.link.as_ref())
    }

    pub fn link_ids(&self) -> Vec<LinkId> {
        self.links().map(|l| l.id).collect()
    }

    pub fn link_count(&self) -> usize {
        self.link_count
    }

    // ========== Energy ==========

    /// Energy of a node in one channel.
    ///
    /// # Errors
    /// - `NodeNotFound` for unknown ids (a known node without energy is 0.0)
    pub fn energy(&self, id: NodeId, entity: EntityId) -> EngineResult<f64> {
        Ok(self.node(id)?.energy(entity))
    }

    /// Add energy to one channel. Non-finite or negative amounts are rejected.
    pub fn add_energy(&mut self, id: NodeId, entity: EntityId, amount: f64) -> EngineResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EngineError::validation(
                "amount",
                format!("energy injection must be finite and >= 0, got {}", amount),
            ));
        }
        if amount == 0.0 {
            self.node(id)?;
            return Ok(());
        }
        let node = self.node_mut(id)?;
        *node.energy.entry(entity).or_insert(0.0) += amount;
        self.energized.insert(id);
        Ok(())
    }

    /// Replace the whole energy map of a node. Empty clears it.
    pub(crate) fn replace_energy(
        &mut self,
        id: NodeId,
        energy: BTreeMap<EntityId, f64>,
    ) -> EngineResult<()> {
        let node = self.node_mut(id)?;
        let energized = !energy.is_empty();
        node.energy = energy;
        if energized {
            self.energized.insert(id);
        } else {
            self.energized.remove(&id);
        }
        Ok(())
    }

    /// Nodes holding any energy, in id order.
    pub fn energized(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.energized.iter().copied()
    }

    pub fn energized_count(&self) -> usize {
        self.energized.len()
    }

    /// Sum of energy in one channel over all energized nodes.
    pub fn total_energy(&self, entity: EntityId) -> f64 {
        self.energized
            .iter()
            .map(|id| self.nodes[id.index()].energy(entity))
            .sum()
    }

    /// Per-channel totals over all energized nodes.
    pub fn energy_by_entity(&self) -> BTreeMap<EntityId, f64> {
        let mut totals = BTreeMap::new();
        for id in &self.energized {
            for (entity, value) in &self.nodes[id.index()].energy {
                *totals.entry(*entity).or_insert(0.0) += *value;
            }
        }
        totals
    }

    /// Channels present anywhere in the graph.
    pub fn entities(&self) -> BTreeSet<EntityId> {
        self.energized
            .iter()
            .flat_map(|id| self.nodes[id.index()].energy.keys().copied())
            .collect()
    }

    pub(crate) fn mark_activated(&mut self, id: NodeId, tick: u64) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.last_activation_tick = Some(tick);
        }
    }
}
