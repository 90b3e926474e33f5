//! Stimulus values.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{Embedding, EntityId, NodeId, StimulusId};

/// Reference to an existing node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRef {
    Id(NodeId),
    Key(String),
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Key(key) => write!(f, "'{}'", key),
        }
    }
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for NodeRef {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

/// Where a stimulus enters the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusEntry {
    Node(NodeRef),
    /// Resolved to the most similar node, or a new one.
    Embedding(Embedding),
}

impl From<NodeRef> for StimulusEntry {
    fn from(node: NodeRef) -> Self {
        Self::Node(node)
    }
}

impl From<NodeId> for StimulusEntry {
    fn from(id: NodeId) -> Self {
        Self::Node(NodeRef::Id(id))
    }
}

impl From<&str> for StimulusEntry {
    fn from(key: &str) -> Self {
        Self::Node(NodeRef::from(key))
    }
}

impl From<Embedding> for StimulusEntry {
    fn from(embedding: Embedding) -> Self {
        Self::Embedding(embedding)
    }
}

/// An external event injecting energy at an entry node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub id: StimulusId,
    pub entry: StimulusEntry,
    pub strength: f64,
    pub entity: EntityId,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub received_at: DateTime<Utc>,
    /// Dropped unapplied if still queued after this instant.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    /// Applied as the external task goal.
    #[serde(default)]
    pub goal_override: Option<Embedding>,
    /// Prime the graph with a reconstructed context around the entry.
    #[serde(default)]
    pub reconstruct: bool,
    /// Affect cue coloring the reconstruction.
    #[serde(default)]
    pub affect: Option<Embedding>,
}

impl Stimulus {
    pub fn new(entry: impl Into<StimulusEntry>, strength: f64) -> Self {
        Self {
            id: StimulusId::new(),
            entry: entry.into(),
            strength,
            entity: EntityId::DEFAULT,
            metadata: BTreeMap::new(),
            received_at: Utc::now(),
            deadline: None,
            goal_override: None,
            reconstruct: false,
            affect: None,
        }
    }

    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = entity;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_goal_override(mut self, goal: Embedding) -> Self {
        self.goal_override = Some(goal);
        self
    }

    #[must_use]
    pub fn with_reconstruction(mut self, reconstruct: bool) -> Self {
        self.reconstruct = reconstruct;
        self
    }

    #[must_use]
    pub fn with_affect(mut self, affect: Embedding) -> Self {
        self.affect = Some(affect);
        self
    }

    #[must_use]
    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = at;
        self
    }

    /// Shape checks that need no graph access.
    ///
    /// # Errors
    /// - `Validation` for a non-finite or non-positive strength, an empty or
    ///   non-finite embedding entry, goal override or affect, or an empty key
    pub fn validate(&self) -> EngineResult<()> {
        if !self.strength.is_finite() || self.strength <= 0.0 {
            return Err(EngineError::validation(
                "strength",
                format!("must be finite and > 0, got {}", self.strength),
            ));
        }
        match &self.entry {
            StimulusEntry::Embedding(e) if e.is_empty() || e.iter().any(|v| !v.is_finite()) => {
                return Err(EngineError::validation("entry", "embedding must be non-empty and finite"));
            }
            StimulusEntry::Node(NodeRef::Key(k)) if k.trim().is_empty() => {
                return Err(EngineError::validation("entry", "node key must not be empty"));
            }
            _ => {}
        }
        for (field, vector) in [("goal_override", &self.goal_override), ("affect", &self.affect)] {
            if let Some(v) = vector {
                if v.is_empty() || v.iter().any(|x| !x.is_finite()) {
                    return Err(EngineError::validation(field, "embedding must be non-empty and finite"));
                }
            }
        }
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map_or(false, |d| now > d)
    }
}
