use std::env;
use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use storefront_event_bus::Verbosity;
use storefront_harness::config::{
    ConfigError, ConfigLocator, ConfigSource, HarnessConfig, LogSink, ENV_DIALOG_DEADLINE_MS,
    ENV_DIALOG_GRACE_MS, ENV_LOG_LEVEL, ENV_STABILIZER_TIMEOUT_MS,
};
use tempfile::TempDir;

const OVERRIDES: [&str; 4] = [
    ENV_LOG_LEVEL,
    ENV_STABILIZER_TIMEOUT_MS,
    ENV_DIALOG_DEADLINE_MS,
    ENV_DIALOG_GRACE_MS,
];

fn clear_overrides() {
    for var in OVERRIDES {
        env::remove_var(var);
    }
}

fn locator(dir: &TempDir) -> ConfigLocator {
    ConfigLocator {
        local: dir.path().join("config").join("harness.yaml"),
        user: Some(dir.path().join("user").join("harness.yaml")),
    }
}

fn write(path: &PathBuf, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
#[serial]
async fn missing_files_fall_back_to_defaults() {
    clear_overrides();
    let dir = TempDir::new().unwrap();

    let loaded = locator(&dir).load(None).await.unwrap();

    assert_eq!(loaded.source, ConfigSource::Defaults);
    assert_eq!(loaded.config, HarnessConfig::default());
}

#[tokio::test]
#[serial]
async fn local_file_wins_over_user_file() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let locator = locator(&dir);
    write(&locator.local, "arbiter:\n  deadline_ms: 3000\n");
    write(
        locator.user.as_ref().unwrap(),
        "arbiter:\n  deadline_ms: 9000\n",
    );

    let loaded = locator.load(None).await.unwrap();

    assert_eq!(loaded.source, ConfigSource::File(locator.local.clone()));
    assert_eq!(loaded.config.arbiter.deadline_ms, 3000);
}

#[tokio::test]
#[serial]
async fn user_file_is_used_when_no_local_file() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let locator = locator(&dir);
    write(
        locator.user.as_ref().unwrap(),
        "observer:\n  verbosity: quiet\nlogging:\n  sink: stderr\n",
    );

    let loaded = locator.load(None).await.unwrap();

    assert_eq!(loaded.config.observer.verbosity, Verbosity::Quiet);
    assert_eq!(loaded.config.logging.sink, LogSink::Stderr);
}

#[tokio::test]
#[serial]
async fn explicit_path_must_exist() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.yaml");

    let err = locator(&dir).load(Some(missing.as_path())).await.unwrap_err();

    assert!(matches!(err, ConfigError::Missing(path) if path == missing));
}

#[tokio::test]
#[serial]
async fn malformed_yaml_reports_the_path() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    write(&path, "stabilizer: [not, a, map]\n");

    let err = locator(&dir).load(Some(path.as_path())).await.unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("broken.yaml"));
}

#[tokio::test]
#[serial]
async fn environment_overrides_file_values() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harness.yaml");
    write(
        &path,
        "logging:\n  level: warn\nstabilizer:\n  default_timeout_ms: 4000\n",
    );
    env::set_var(ENV_LOG_LEVEL, "debug");
    env::set_var(ENV_STABILIZER_TIMEOUT_MS, "7500");
    env::set_var(ENV_DIALOG_DEADLINE_MS, "2000");
    env::set_var(ENV_DIALOG_GRACE_MS, "0");

    let loaded = locator(&dir).load(Some(path.as_path())).await;
    clear_overrides();
    let config = loaded.unwrap().config;

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.stabilizer.default_timeout_ms, 7500);
    assert_eq!(config.arbiter.deadline_ms, 2000);
    assert_eq!(config.arbiter.grace_ms, 0);
}

#[tokio::test]
#[serial]
async fn non_numeric_override_is_rejected() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    env::set_var(ENV_DIALOG_DEADLINE_MS, "ten seconds");

    let result = locator(&dir).load(None).await;
    clear_overrides();

    match result {
        Err(ConfigError::InvalidOverride { var, value }) => {
            assert_eq!(var, ENV_DIALOG_DEADLINE_MS);
            assert_eq!(value, "ten seconds");
        }
        other => panic!("expected an override error, got {:?}", other.map(|l| l.source)),
    }
}

#[tokio::test]
#[serial]
async fn zero_deadline_from_file_fails_validation() {
    clear_overrides();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("harness.yaml");
    write(&path, "arbiter:\n  deadline_ms: 0\n");

    let err = locator(&dir).load(Some(path.as_path())).await.unwrap_err();

    assert!(matches!(err, ConfigError::Invalid(message) if message.contains("deadline_ms")));
}
