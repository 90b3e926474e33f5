//! Persistence boundary.
//!
//! The engine runs on an in-memory working graph. Snapshots are the only
//! contact with a backing store: [`GraphSnapshot`] is the record format and
//! [`SnapshotStore`] the collaborator that writes and reads it. Loading is
//! validate-then-swap, so a corrupt snapshot never touches the live graph.

mod snapshot;
mod store;

pub use snapshot::{GraphSnapshot, LinkRecord, NodeRecord, SNAPSHOT_FORMAT_VERSION};
pub use store::{DurabilityStatus, JsonFileStore, MemorySnapshotStore, SnapshotStore};
