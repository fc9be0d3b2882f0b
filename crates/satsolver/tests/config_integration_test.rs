/// Integration tests for the configuration system
///
/// These tests verify that solver configuration loads correctly from files
/// and environment variables, and that it changes solving behavior.
use satsolver::config::{ConfigError, ConfigSource, ObsoletesMode, SolverConfig};
use satsolver::{Pool, Request, Selector, SolvableRecord, Solver};
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_defaults() {
    let config = SolverConfig::default();

    assert_eq!(config.obsoletes_mode, ObsoletesMode::Soft);
    assert!(!config.allow_uninstall);
    assert!(!config.lock_installed);
    assert!(config.install_recommends);
    assert!(config.multiversion.is_empty());
    assert_eq!(config.max_steps, None);
    assert_eq!(config.timeout(), None);
    assert_eq!(config.max_problems, 8);
    assert!(config.minimize_cores);
    assert_eq!(config.debug_level, 0);
}

#[test]
fn test_load_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = SolverConfig::from_file(temp_dir.path().join("solver.json")).unwrap();
    assert_eq!(config.max_problems, 8);
}

#[test]
fn test_load_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("solver.json");
    fs::write(
        &config_file,
        r#"{
            "obsoletes-mode": "hard",
            "allow-uninstall": true,
            "multiversion": ["kernel", "kernel-devel"],
            "timeout-ms": 1500,
            "max-problems": 2
        }"#,
    )
    .unwrap();

    let config = SolverConfig::from_file(&config_file).unwrap();
    assert_eq!(config.obsoletes_mode, ObsoletesMode::Hard);
    assert!(config.allow_uninstall);
    assert!(config.is_multiversion("kernel-devel"));
    assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    assert_eq!(config.max_problems, 2);
    assert_eq!(config.source_of("max-problems"), ConfigSource::File);
    assert_eq!(config.source_of("debug-level"), ConfigSource::Default);
}

#[test]
fn test_load_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("solver.json");
    fs::write(&config_file, "{ not json").unwrap();

    let result = SolverConfig::from_file(&config_file);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("solver.json");
    fs::write(&config_file, r#"{"max-steps": 10, "debug-level": 1}"#).unwrap();

    env::set_var("SATSOLVER_MAX_STEPS", "250");
    env::set_var("SATSOLVER_DEBUG_LEVEL", "4");

    let mut config = SolverConfig::from_file(&config_file).unwrap();
    let applied = config.apply_env();

    // Clean up
    env::remove_var("SATSOLVER_MAX_STEPS");
    env::remove_var("SATSOLVER_DEBUG_LEVEL");

    applied.unwrap();
    assert_eq!(config.max_steps, Some(250));
    assert_eq!(config.debug_level, 4);
    assert_eq!(config.log_filter(), log::LevelFilter::Trace);
    assert_eq!(
        config.source_of("max-steps"),
        ConfigSource::Environment("SATSOLVER_MAX_STEPS".to_string())
    );
}

#[test]
fn test_config_round_trips_through_json() {
    let mut config = SolverConfig::default();
    config.obsoletes_mode = ObsoletesMode::Hard;
    config.multiversion = vec!["kernel".to_string()];
    config.max_steps = Some(100);

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"obsoletes-mode\":\"hard\""));
    assert!(!json.contains("timeout-ms"));

    let parsed = SolverConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed.obsoletes_mode, ObsoletesMode::Hard);
    assert_eq!(parsed.max_steps, Some(100));
    assert!(parsed.is_multiversion("kernel"));
}

#[test]
fn test_config_changes_outcome() {
    let mut pool = Pool::new();
    let system = pool.add_repository("@System", 0);
    pool.set_installed(system).unwrap();
    let repo = pool.add_repository("main", 0);
    let old = pool
        .add_solvable(system, SolvableRecord::new("old", "1", "noarch"))
        .unwrap();
    let new = pool
        .add_solvable(repo, SolvableRecord::new("new", "1", "noarch").obsoletes("old"))
        .unwrap();

    let mut request = Request::new();
    request.install(Selector::Solvable(new)).lock(Selector::Solvable(old));

    let mut soft_config = SolverConfig::default();
    soft_config.lock_installed = true;
    let soft = Solver::new(&pool).with_config(soft_config).solve(&request).unwrap();
    assert!(soft.is_satisfied());

    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("solver.json");
    fs::write(&config_file, r#"{"obsoletes-mode": "hard", "lock-installed": true}"#).unwrap();
    let config = SolverConfig::from_file(&config_file).unwrap();

    let hard = Solver::new(&pool).with_config(config).solve(&request).unwrap();
    assert_eq!(hard.problems().map(|p| p.len()), Some(1));
}
