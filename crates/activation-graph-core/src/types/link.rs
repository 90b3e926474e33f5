//! Directed, typed, learned link.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Embedding, LinkId, NodeId};

/// Relationship tag of a link.
///
/// Several links of different types may join the same ordered pair; the
/// (source, target, type) triple is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Learned co-activation; the default for discovered links.
    Associative,
    /// Embedding similarity.
    Semantic,
    /// Source precedes target in time.
    Temporal,
    /// Source causes or influences target.
    Causal,
    /// Source is parent or category of target.
    Hierarchical,
}

impl LinkType {
    #[inline]
    pub fn all() -> [LinkType; 5] {
        [
            Self::Associative,
            Self::Semantic,
            Self::Temporal,
            Self::Causal,
            Self::Hierarchical,
        ]
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Associative => 0,
            Self::Semantic => 1,
            Self::Temporal => 2,
            Self::Causal => 3,
            Self::Hierarchical => 4,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Associative),
            1 => Some(Self::Semantic),
            2 => Some(Self::Temporal),
            3 => Some(Self::Causal),
            4 => Some(Self::Hierarchical),
            _ => None,
        }
    }
}

impl Default for LinkType {
    fn default() -> Self {
        Self::Associative
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Associative => "associative",
            Self::Semantic => "semantic",
            Self::Temporal => "temporal",
            Self::Causal => "causal",
            Self::Hierarchical => "hierarchical",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown link type '{}'", s))
    }
}

/// Why a link exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationReason {
    Explicit,
    Coactivation,
    Semantic,
}

impl fmt::Display for CreationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Explicit => "explicit",
            Self::Coactivation => "coactivation",
            Self::Semantic => "semantic",
        };
        write!(f, "{}", s)
    }
}

/// A directed link in the working graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: NodeId,
    pub target: NodeId,
    pub link_type: LinkType,
    /// Learned weight in `[0, w_max)`.
    pub weight: f64,
    /// Affect coloring. Read by reconstruction under an affect cue; diffusion
    /// ignores it.
    pub affect: Option<Embedding>,
    pub creation_reason: CreationReason,
    pub confidence: f64,
    pub created_tick: u64,
    pub last_traversed_tick: Option<u64>,
    pub probation_start_tick: u64,
    /// Set once the weight has risen above the graduation weight; explicit
    /// links start graduated.
    pub graduated: bool,
    /// Engine clock value up to which weight decay has been applied.
    pub(crate) decay_clock: f64,
}

impl Link {
    pub fn is_probationary(&self) -> bool {
        !self.graduated
    }

    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}
