//! Activation Graph Core Library
//!
//! Energy diffusion over a weighted directed graph that learns from its own
//! traffic and holds itself near the edge of criticality. Coherent energized
//! clusters emerge as entities; a budgeted global workspace keeps the few
//! that matter for the current goal.
//!
//! # Architecture
//!
//! This crate defines:
//! - Graph storage with multi-channel node energy (`graph`, `types`)
//! - Per-tick physics: diffusion, decay and Hebbian learning (`dynamics`)
//! - Spectral-radius feedback control of α and δ (`criticality`)
//! - Link creation, graduation and pruning (`topology`)
//! - Entity cluster emergence and dissolution (`entity`)
//! - The goal stack and workspace selection (`goal`, `workspace`)
//! - Stimulus intake and context replay (`stimulus`, `context`)
//! - The engine pipeline, its async scheduler and snapshots
//!   (`engine`, `scheduler`, `persistence`)
//! - Error types and configuration
//!
//! # Example
//!
//! ```
//! use activation_graph_core::config::EngineConfig;
//! use activation_graph_core::engine::{Engine, NodeRequest};
//! use activation_graph_core::stimulus::Stimulus;
//! use activation_graph_core::topology::ExplicitLink;
//! use activation_graph_core::types::{EntityId, LinkType};
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! let a = engine.create_node(NodeRequest::new("a")).unwrap();
//! let b = engine.create_node(NodeRequest::new("b")).unwrap();
//! engine
//!     .create_link(ExplicitLink::new(a, b, LinkType::Associative))
//!     .unwrap();
//!
//! engine.apply_stimulus(Stimulus::new(a, 1.0)).unwrap();
//! let report = engine.tick(1.0).unwrap();
//! assert_eq!(report.tick, 1);
//! assert!(engine.node_energy(b, EntityId::default()).unwrap() > 0.0);
//! ```

pub mod config;
pub mod context;
pub mod criticality;
pub mod dynamics;
pub mod engine;
pub mod entity;
pub mod error;
pub mod goal;
pub mod graph;
pub mod persistence;
pub mod scheduler;
pub mod stimulus;
pub mod topology;
pub mod types;
pub mod workspace;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::{Engine, EngineView, NodeRequest, TickReport};
pub use error::{EngineError, EngineResult, PersistenceError};
pub use scheduler::{EngineHandle, Scheduler, SchedulerState};
