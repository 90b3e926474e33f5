use super::*;

#[test]
fn test_defaults_validate() {
    let config = EngineConfig::default();
    config.validate().expect("defaults must validate");
    assert_eq!(config.criticality.target, 1.0);
    assert!(config.learning.max_step < 1.0);
    assert!(config.emergence.exit_margin < config.emergence.enter_margin);
}

#[test]
fn test_partial_toml_falls_back_to_defaults() {
    let config = EngineConfig::from_toml_str(
        r#"
        [criticality]
        kp = 0.4

        [scheduler]
        min_tick_ms = 20
        "#,
    )
    .unwrap();
    assert_eq!(config.criticality.kp, 0.4);
    assert_eq!(config.criticality.ki, constants::criticality::KI);
    assert_eq!(config.scheduler.min_tick_ms, 20);
    assert_eq!(config.scheduler.max_tick_ms, constants::scheduler::MAX_TICK_MS);
    assert_eq!(config.workspace, WorkspaceConfig::default());
}

#[test]
fn test_recognized_aliases() {
    let config = EngineConfig::from_toml_str(
        r#"
        [learning]
        learning_rate_peripheral_ratio = 0.15

        [workspace]
        workspace_capacity_base = 10.0

        [scheduler]
        stimulus_debounce_window = 250
        "#,
    )
    .unwrap();
    assert_eq!(config.learning.peripheral_ratio, 0.15);
    assert_eq!(config.workspace.capacity_base, 10.0);
    assert_eq!(config.scheduler.debounce_window_ms, 250);
}

#[test]
fn test_toml_round_trip() {
    let mut config = EngineConfig::default();
    config.goals.default_embedding = vec![0.5, 0.5];
    let text = config.to_toml_string().unwrap();
    let back = EngineConfig::from_toml_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_invalid_config_names_section() {
    let mut config = EngineConfig::default();
    config.criticality.alpha_min = 0.6;
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("[criticality]"), "{}", err);
    assert!(err.contains("alpha_min"), "{}", err);
}

#[test]
fn test_max_step_must_stay_below_one() {
    let mut config = EngineConfig::default();
    config.learning.max_step = 1.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_tick_bounds_checked() {
    let mut config = EngineConfig::default();
    config.scheduler.max_tick_ms = 10;
    config.scheduler.min_tick_ms = 20;
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("[scheduler]"), "{}", err);
}

#[test]
fn test_alpha_init_must_sit_inside_controller_bounds() {
    let mut config = EngineConfig::default();
    config.diffusion.alpha_init = 0.9;
    assert!(config.validate().is_err());
    config.criticality.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_peripheral_learning_toggle() {
    let mut learning = LearningConfig::default();
    let ws = learning.learning_rate(true);
    let peripheral = learning.learning_rate(false);
    assert!((peripheral - ws * learning.peripheral_ratio).abs() < 1e-12);
    learning.peripheral_learning = false;
    assert_eq!(learning.learning_rate(false), 0.0);
}

#[test]
fn test_from_file_reports_missing_path() {
    let err = EngineConfig::from_file("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfig(_)));
}

#[test]
fn test_from_file_reads_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[workspace]\ncapacity_max = 12.0\n").unwrap();
    let config = EngineConfig::from_file(&path).unwrap();
    assert_eq!(config.workspace.capacity_max, 12.0);
}

#[test]
fn test_env_override_applies_and_ignores_garbage() {
    // Unique variables so parallel tests do not race on shared names.
    std::env::set_var("ACTIVATION_GRAPH_KI", "0.25");
    std::env::set_var("ACTIVATION_GRAPH_QUEUE_CAPACITY", "not-a-number");
    let config = EngineConfig::default().with_env_overrides();
    std::env::remove_var("ACTIVATION_GRAPH_KI");
    std::env::remove_var("ACTIVATION_GRAPH_QUEUE_CAPACITY");
    assert_eq!(config.criticality.ki, 0.25);
    assert_eq!(
        config.scheduler.queue_capacity,
        constants::scheduler::QUEUE_CAPACITY
    );
}

#[test]
fn test_coactivation_floor_must_reach_creation_threshold() {
    let mut config = EngineConfig::default();
    let topology = &config.topology;
    assert!(topology.weight_coactivation * topology.min_correlation >= topology.creation_threshold);

    config.topology.creation_threshold = 0.5;
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("[topology]"), "{}", err);
    assert!(err.contains("min_correlation"), "{}", err);

    // Switching the source off lifts the constraint.
    config.topology.weight_coactivation = 0.0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_health_bounds_must_bracket_neutral() {
    let mut config = EngineConfig::default();
    config.stimulus.health_min = 1.2;
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("[stimulus]"), "{}", err);

    config.stimulus.health_min = 0.5;
    config.stimulus.max_matches = 0;
    assert!(config.validate().is_err());
}
