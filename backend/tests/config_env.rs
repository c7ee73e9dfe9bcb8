use std::io::Write;

use cosmic_planner::config::{PlannerConfig, CONFIG_PATH_ENV, STEP_MINUTES_ENV, WORKERS_ENV};
use cosmic_planner::PlanError;

mod support;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

#[test]
fn test_load_reads_config_path_env() {
    let file = write_config(
        r#"
[scoring]
step_minutes = 10.0
anonymous_limiting_magnitude = 15.0

[limits]
max_plan_limit = 50
"#,
    );
    let path = file.path().to_str().unwrap().to_string();

    let config = support::with_scoped_env(
        &[
            (CONFIG_PATH_ENV, Some(path.as_str())),
            (WORKERS_ENV, None),
            (STEP_MINUTES_ENV, None),
        ],
        PlannerConfig::load,
    )
    .unwrap();

    assert_eq!(config.scoring.step_minutes, 10.0);
    assert_eq!(config.scoring.anonymous_limiting_magnitude, 15.0);
    assert_eq!(config.limits.max_plan_limit, 50);
    assert_eq!(
        config.limits.default_plan_limit,
        PlannerConfig::default().limits.default_plan_limit
    );
}

#[test]
fn test_env_overrides_file_values() {
    let file = write_config("[workers]\nthreads = 2\n\n[scoring]\nstep_minutes = 10.0\n");
    let path = file.path().to_str().unwrap().to_string();

    let config = support::with_scoped_env(
        &[
            (CONFIG_PATH_ENV, Some(path.as_str())),
            (WORKERS_ENV, Some("6")),
            (STEP_MINUTES_ENV, Some(" 2.5 ")),
        ],
        PlannerConfig::load,
    )
    .unwrap();

    assert_eq!(config.workers.threads, 6);
    assert_eq!(config.worker_threads(), 6);
    assert_eq!(config.scoring.step_minutes, 2.5);
}

#[test]
fn test_invalid_override_is_configuration_error() {
    let file = write_config("");
    let path = file.path().to_str().unwrap().to_string();

    let err = support::with_scoped_env(
        &[
            (CONFIG_PATH_ENV, Some(path.as_str())),
            (WORKERS_ENV, Some("many")),
            (STEP_MINUTES_ENV, None),
        ],
        PlannerConfig::load,
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::Configuration(ref msg) if msg.contains(WORKERS_ENV)));

    let err = support::with_scoped_env(
        &[
            (CONFIG_PATH_ENV, Some(path.as_str())),
            (WORKERS_ENV, None),
            (STEP_MINUTES_ENV, Some("0")),
        ],
        PlannerConfig::load,
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::Configuration(_)));
}

#[test]
fn test_missing_config_file_is_error() {
    let err = support::with_scoped_env(
        &[(CONFIG_PATH_ENV, Some("/nonexistent/planner.toml"))],
        PlannerConfig::load,
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::Configuration(ref msg) if msg.contains("Failed to read")));
}

#[test]
fn test_invalid_file_values_rejected() {
    let file =
        write_config("[exposure]\nmin_exposure_seconds = 60.0\nmax_exposure_seconds = 10.0\n");
    let err = PlannerConfig::from_file(file.path()).unwrap_err();
    assert!(!err.is_client_error());
    assert!(err.to_string().contains("max_exposure_seconds"));
}
