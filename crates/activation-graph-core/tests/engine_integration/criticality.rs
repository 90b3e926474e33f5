//! Closed-loop convergence of ρ toward the target on a live graph.
//!
//! A complete graph on five nodes has Perron root `4w`, so with α = 0.25:
//! w = 0.75 and δ = 0 start at ρ = 1.5; w = 0.5 and δ = 0.6 start at ρ = 0.5.

use activation_graph_core::criticality::SafetyState;
use activation_graph_core::engine::Engine;
use activation_graph_core::types::EntityId;

use crate::common::{complete_graph, controller_only_config};

/// Keep every node on the frontier and return the measured ρ per tick.
fn drive(weight: f64, state_decay: f64, ticks: usize) -> (Engine, Vec<f64>) {
    let mut engine = Engine::new(controller_only_config(state_decay)).expect("engine");
    let ids = complete_graph(&mut engine, 5, weight);
    let mut trace = Vec::with_capacity(ticks);
    for _ in 0..ticks {
        for id in &ids {
            engine.inject_energy(*id, EntityId::DEFAULT, 1.0).expect("inject");
        }
        let report = engine.tick(1.0).expect("tick");
        trace.push(report.criticality.global.expect("frontier is never empty"));
    }
    (engine, trace)
}

fn variance(xs: &[f64]) -> f64 {
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64
}

#[test]
fn test_supercritical_start_converges() {
    let (engine, trace) = drive(0.75, 0.0, 600);
    assert!((trace[0] - 1.5).abs() < 1e-6, "initial rho {}", trace[0]);

    let tail = &trace[300..];
    assert!(tail.iter().all(|r| (r - 1.0).abs() <= 0.05));
    assert!(variance(tail) < 1e-4);

    let snapshot = engine.criticality();
    assert_eq!(snapshot.safety, Some(SafetyState::Critical));
    // Damping came from both knobs.
    assert!(snapshot.rates.alpha < 0.25);
    assert!(snapshot.rates.state_decay > 0.0);
}

#[test]
fn test_subcritical_start_converges() {
    let (engine, trace) = drive(0.5, 0.6, 600);
    assert!((trace[0] - 0.5).abs() < 1e-6, "initial rho {}", trace[0]);

    let tail = &trace[300..];
    assert!(tail.iter().all(|r| (r - 1.0).abs() <= 0.05));
    assert!(variance(tail) < 1e-4);

    let snapshot = engine.criticality();
    assert!(snapshot.rates.alpha > 0.25);
    assert!(snapshot.rates.state_decay < 0.6);
}

#[test]
fn test_disabled_controller_only_measures() {
    let mut config = controller_only_config(0.0);
    config.criticality.enabled = false;
    let mut engine = Engine::new(config).expect("engine");
    let ids = complete_graph(&mut engine, 5, 0.75);
    for _ in 0..20 {
        for id in &ids {
            engine.inject_energy(*id, EntityId::DEFAULT, 1.0).expect("inject");
        }
        let report = engine.tick(1.0).expect("tick");
        assert!((report.criticality.global.expect("measured") - 1.5).abs() < 1e-6);
        assert_eq!(report.rates_used.alpha, 0.25);
    }
    assert_eq!(engine.criticality().safety, Some(SafetyState::Supercritical));
}

#[test]
fn test_empty_frontier_holds_rates() {
    let mut engine = Engine::new(controller_only_config(0.0)).expect("engine");
    complete_graph(&mut engine, 5, 0.75);
    for _ in 0..10 {
        let report = engine.tick(1.0).expect("tick");
        assert_eq!(report.criticality.global, None);
        assert_eq!(report.criticality.integral, 0.0);
        assert_eq!(report.rates_used.alpha, 0.25);
    }
}
