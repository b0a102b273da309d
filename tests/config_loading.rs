//! Integration test: Configuration utilities
//!
//! Tests config path resolution and YAML loading of the dashboard config.

use nft_dashboard::app::{ConfigError, DashboardConfig};
use nft_dashboard::bin_common::{load_config_from_env, ConfigType};
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn test_dashboard_config_default_path() {
    env::remove_var("DASHBOARD_CONFIG_PATH");

    let config_path = load_config_from_env(ConfigType::Dashboard);
    assert_eq!(config_path.to_str().unwrap(), "config/dashboard.yaml");
}

#[test]
fn test_custom_config() {
    let custom = ConfigType::Custom("custom/path.yaml".to_string());
    let config_path = load_config_from_env(custom);

    assert_eq!(config_path.to_str().unwrap(), "custom/path.yaml");
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
log_level: debug
summary_interval_secs: 10
realtime:
  url: wss://rt.example.com/ws
  protocols: [dashboard.v1]
  reconnect_interval_ms: 1500
  max_reconnect_attempts: 8
  heartbeat_interval_ms: 0
api:
  base_url: https://api.example.com
toasts:
  connection_alerts: false
"#,
    );

    let config = DashboardConfig::load(file.path()).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.summary_interval_secs, 10);
    assert_eq!(config.realtime.protocols, vec!["dashboard.v1".to_string()]);
    assert_eq!(config.realtime.reconnect_interval_ms, 1500);
    assert_eq!(config.realtime.max_reconnect_attempts, 8);
    assert_eq!(config.realtime.heartbeat_interval(), None);
    assert!(!config.toasts.connection_alerts);
    assert!(config.toasts.request_alerts);
}

#[test]
fn test_invalid_yaml_is_reported() {
    let file = write_config("realtime: [not, a, map]\n");

    let err = DashboardConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::YamlError(_)));
}

#[test]
fn test_missing_file_is_reported() {
    let err = DashboardConfig::load("does/not/exist.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::FileError(_)));
}

#[test]
fn test_validation_runs_on_load() {
    let file = write_config("log_level: chatty\n");

    let err = DashboardConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}
