//! Goal stack behavior seen from the engine: override, dwell and the
//! default fallback.

use activation_graph_core::engine::{Engine, NodeRequest};
use activation_graph_core::goal::{GoalSource, ScheduledGoal};
use activation_graph_core::stimulus::Stimulus;
use activation_graph_core::types::EntityId;

use crate::common::{link, quiet_config};

fn dwell(engine: &Engine) -> u64 {
    engine.config().goals.min_dwell_ticks
}

#[test]
fn test_empty_engine_runs_on_default_goal() {
    let mut engine = Engine::new(quiet_config()).expect("engine");
    for _ in 0..25 {
        let report = engine.tick(1.0).expect("tick");
        assert_eq!(report.goal.source, GoalSource::Default);
        assert!(report.goal.on_default);
        assert!(report.workspace.clusters.is_empty());
    }
    // Never left the default, so no fallback was needed.
    assert_eq!(engine.metrics().deadlock_avoided, 0);
    assert_eq!(engine.metrics().goal_switches, 0);
}

#[test]
fn test_fallback_counted_once_per_deadlock() {
    let mut engine = Engine::new(quiet_config()).expect("engine");
    engine.set_external_goal(vec![1.0, 0.0], 1.0).expect("goal");
    let report = engine.tick(1.0).expect("tick");
    assert_eq!(report.goal.source, GoalSource::External);
    assert!(report.goal.switched);

    engine.clear_external_goal();
    let mut fallbacks = 0;
    for _ in 0..=dwell(&engine) + 5 {
        let report = engine.tick(1.0).expect("tick");
        if report.goal.deadlock_avoided_event {
            fallbacks += 1;
            assert_eq!(report.goal.source, GoalSource::Default);
        }
    }
    assert_eq!(engine.current_goal().source, GoalSource::Default);
    assert_eq!(fallbacks, 1);
    assert_eq!(engine.metrics().deadlock_avoided, 1);
    assert_eq!(engine.metrics().goal_switches, 2);
}

#[test]
fn test_external_goal_preempts_schedule_without_dwell() {
    let mut engine = Engine::new(quiet_config()).expect("engine");
    engine
        .schedule_goal(ScheduledGoal {
            embedding: vec![0.0, 1.0],
            confidence: 1.0,
            from_tick: 1,
            until_tick: None,
        })
        .expect("schedule");
    for _ in 0..=dwell(&engine) {
        engine.tick(1.0).expect("tick");
    }
    assert_eq!(engine.current_goal().source, GoalSource::Scheduled);

    engine.set_external_goal(vec![1.0, 0.0], 0.9).expect("goal");
    let report = engine.tick(1.0).expect("tick");
    assert_eq!(report.goal.source, GoalSource::External);
    assert_eq!(engine.current_goal().embedding, vec![1.0, 0.0]);
}

#[test]
fn test_schedule_window_validated() {
    let mut engine = Engine::new(quiet_config()).expect("engine");
    let err = engine
        .schedule_goal(ScheduledGoal {
            embedding: vec![1.0],
            confidence: 1.0,
            from_tick: 10,
            until_tick: Some(10),
        })
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_stimulus_bootstraps_goal_while_workspace_empty() {
    let mut engine = Engine::new(quiet_config()).expect("engine");
    // A lone node can never form a cluster, so the workspace stays empty.
    let id = engine
        .create_node(NodeRequest::new("lone").with_embedding(vec![0.6, 0.8]))
        .expect("node");
    engine.apply_stimulus(Stimulus::new(id, 1.0)).expect("stimulus");

    for _ in 0..=dwell(&engine) {
        let report = engine.tick(1.0).expect("tick");
        assert!(report.workspace.clusters.is_empty());
    }
    assert_eq!(engine.current_goal().source, GoalSource::Stimulus);
    assert_eq!(engine.current_goal().embedding, vec![0.6, 0.8]);
}

#[test]
fn test_external_goal_replaces_emergent_goal_next_tick() {
    let mut engine = Engine::new(quiet_config()).expect("engine");
    let ids: Vec<_> = [[1.0, 0.0], [0.9, 0.1], [0.95, 0.05]]
        .iter()
        .enumerate()
        .map(|(i, e)| {
            engine
                .create_node(NodeRequest::new(format!("c{}", i)).with_embedding(e.to_vec()))
                .expect("node")
        })
        .collect();
    for a in &ids {
        for b in &ids {
            if a != b {
                link(&mut engine, *a, *b, 0.5);
            }
        }
    }

    let mut emergent = false;
    for _ in 0..60 {
        for id in &ids {
            engine.inject_energy(*id, EntityId::DEFAULT, 1.0).expect("inject");
        }
        let report = engine.tick(1.0).expect("tick");
        if report.goal.source == GoalSource::Emergent {
            assert!(!report.workspace.clusters.is_empty());
            emergent = true;
            break;
        }
    }
    assert!(emergent, "workspace content never became the goal");

    // Low confidence does not matter: an external goal switches at once.
    engine.set_external_goal(vec![0.0, 1.0], 0.1).expect("goal");
    let report = engine.tick(1.0).expect("tick");
    assert_eq!(report.goal.source, GoalSource::External);
    assert_eq!(engine.current_goal().embedding, vec![0.0, 1.0]);
}
