//! Core data types: identifiers, nodes, links, embeddings.

mod embedding;
mod ids;
mod link;
mod node;

pub use embedding::{cosine_similarity, weighted_centroid, Embedding};
pub use ids::{ClusterId, EntityId, LinkId, NodeId, StimulusId};
pub use link::{CreationReason, Link, LinkType};
pub use node::Node;
