//! Working graph: arena storage and active-frontier iteration.
//!
//! # Module Structure
//!
//! - `store`: node/link arena, adjacency, dedup index, energy map
//! - `frontier`: energized nodes above the activity floor plus one hop

mod frontier;
mod store;


pub use frontier::Frontier;
pub use store::{GraphStore, NewLink, NewNode};
