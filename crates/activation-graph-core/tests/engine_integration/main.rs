//! End-to-end tests for the activation graph engine.
//!
//! Every suite drives the engine (or its scheduler) through the public API
//! only and checks observable behavior over many ticks.

mod common;

mod criticality;
mod goals;
mod invariants;
mod persistence;
mod scheduler;
mod topology;
