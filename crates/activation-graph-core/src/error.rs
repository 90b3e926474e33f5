//! Error types for engine operations.
//!
//! Only caller-facing failures are errors. Numeric edge cases inside a tick
//! (negative energy, a weight touching its ceiling) are clamped and counted by
//! [`StabilityMonitor`](crate::engine::StabilityMonitor); a full workspace and a
//! missing goal are normal selection outcomes. None of those appear here.

use thiserror::Error;

use crate::types::{LinkId, LinkType, NodeId};

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced to callers of the engine and its handle.
///
/// Validation failures are raised before anything is enqueued or mutated.
#[derive(Error, Debug)]
pub enum EngineError {
    // ========== Lookup Errors ==========
    /// Node not found in graph.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Link not found (removed, or a stale generation).
    #[error("Link not found: {0}")]
    LinkNotFound(LinkId),

    /// Stimulus entry could not be resolved to an existing or creatable node.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    // ========== Validation Errors ==========
    /// A link with the same (source, target, type) triple already exists.
    #[error("Duplicate link: {from} -> {to} ({link_type}) already exists as {existing}")]
    DuplicateLink {
        from: NodeId,
        to: NodeId,
        link_type: LinkType,
        existing: LinkId,
    },

    /// Node key already taken.
    #[error("Duplicate node key: {0}")]
    DuplicateNode(String),

    /// Malformed request value.
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    // ========== Backpressure / Lifecycle ==========
    /// Stimulus queue is full.
    #[error("Engine busy: stimulus queue full ({capacity} pending), retry later")]
    Busy { capacity: usize },

    /// The scheduler has stopped and no longer accepts requests.
    #[error("Engine has shut down")]
    ShutDown,

    // ========== Configuration Errors ==========
    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========== Persistence Errors ==========
    /// Snapshot load/save failure.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl EngineError {
    /// Shorthand for a [`EngineError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same request later may succeed.
    ///
    /// `Busy` clears once the scheduler drains its queue; persistence
    /// failures are usually transient I/O. Everything else is a caller bug.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Busy { .. } | Self::Persistence(_))
    }

    /// True for errors raised by request validation (no state mutated).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_)
                | Self::LinkNotFound(_)
                | Self::InvalidReference(_)
                | Self::DuplicateLink { .. }
                | Self::DuplicateNode(_)
                | Self::Validation { .. }
        )
    }
}

/// Errors at the backing-store boundary.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Snapshot decoded but is internally inconsistent.
    #[error("Corrupted snapshot in {location}: {details}")]
    Corrupted { location: String, details: String },

    /// Snapshot written by an incompatible format version.
    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { expected: u32, found: u32 },

    /// No snapshot has been written yet.
    #[error("No snapshot available at {0}")]
    Missing(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_link_display_names_triple() {
        let err = EngineError::DuplicateLink {
            from: NodeId(1),
            to: NodeId(2),
            link_type: LinkType::Associative,
            existing: LinkId::new(7, 0),
        };
        let msg = err.to_string();
        assert!(msg.contains("n1"));
        assert!(msg.contains("n2"));
        assert!(msg.contains("associative"));
        assert!(err.is_validation());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_busy_is_recoverable() {
        let err = EngineError::Busy { capacity: 16 };
        assert!(err.is_recoverable());
        assert!(!err.is_validation());
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_persistence_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EngineError = PersistenceError::from(io).into();
        assert!(matches!(err, EngineError::Persistence(PersistenceError::Io(_))));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_serde_json_error_maps_to_serialization() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err = PersistenceError::from(bad.unwrap_err());
        assert!(matches!(err, PersistenceError::Serialization(_)));
    }

    #[test]
    fn test_validation_helper() {
        let err = EngineError::validation("strength", "must be positive, got -1");
        assert_eq!(
            err.to_string(),
            "Validation failed for strength: must be positive, got -1"
        );
    }
}
