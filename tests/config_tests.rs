// Config loading and validation tests

use speedmon::config::{AppConfig, DisplayFormat};
use std::path::Path;

const VALID_CONFIG: &str = r#"
[monitor]
interval_secs = 10

[speedtest]
timeout_secs = 30
upload_bytes = 1000000

[[speedtest.servers]]
name = "local"
latency_url = "http://127.0.0.1:8080/ping"
download_url = "http://127.0.0.1:8080/down"
upload_url = "http://127.0.0.1:8080/up"

[output]
directory = "logs"
file_prefix = "speed_log"

[display]
max_points = 30
format = "text"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.monitor.interval_secs, 10);
    assert_eq!(config.speedtest.timeout_secs, 30);
    assert_eq!(config.speedtest.upload_bytes, 1_000_000);
    assert_eq!(config.speedtest.servers.len(), 1);
    assert_eq!(config.speedtest.servers[0].name, "local");
    assert_eq!(config.output.directory, Path::new("logs"));
    assert_eq!(config.display.max_points, 30);
    assert_eq!(config.display.format, DisplayFormat::Text);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults");
    assert_eq!(config.monitor.interval_secs, 10);
    assert_eq!(config.output.file_prefix, "speed_log");
    assert_eq!(config.output.directory, Path::new("."));
    assert_eq!(config.display.max_points, 30);
    assert!(!config.speedtest.servers.is_empty());
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let config = AppConfig::load_from_str("[monitor]\ninterval_secs = 60\n").unwrap();
    assert_eq!(config.monitor.interval_secs, 60);
    assert_eq!(config.speedtest.timeout_secs, 30);
}

#[test]
fn test_json_display_format() {
    let config = AppConfig::load_from_str("[display]\nformat = \"json\"\n").unwrap();
    assert_eq!(config.display.format, DisplayFormat::Json);
    assert!(AppConfig::load_from_str("[display]\nformat = \"xml\"\n").is_err());
}

#[test]
fn test_config_validation_rejects_zero_interval() {
    let bad = VALID_CONFIG.replace("interval_secs = 10", "interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("monitor.interval_secs"));
}

#[test]
fn test_config_validation_rejects_zero_timeout() {
    let bad = VALID_CONFIG.replace("timeout_secs = 30", "timeout_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("speedtest.timeout_secs"));
}

#[test]
fn test_config_validation_rejects_zero_upload_bytes() {
    let bad = VALID_CONFIG.replace("upload_bytes = 1000000", "upload_bytes = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("upload_bytes"));
}

#[test]
fn test_config_validation_rejects_empty_server_list() {
    let err = AppConfig::load_from_str("[speedtest]\nservers = []\n").unwrap_err();
    assert!(err.to_string().contains("speedtest.servers"));
}

#[test]
fn test_config_validation_rejects_server_without_url() {
    let bad = VALID_CONFIG.replace("upload_url = \"http://127.0.0.1:8080/up\"", "upload_url = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("\"local\""));
}

#[test]
fn test_config_validation_rejects_empty_file_prefix() {
    let bad = VALID_CONFIG.replace("file_prefix = \"speed_log\"", "file_prefix = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("output.file_prefix"));
}

#[test]
fn test_config_validation_rejects_zero_max_points() {
    let bad = VALID_CONFIG.replace("max_points = 30", "max_points = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("display.max_points"));
}

#[test]
fn test_explicit_config_file_must_exist() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");
    assert!(AppConfig::load(Some(missing.as_path())).is_err());

    let present = dir.path().join("speedmon.toml");
    std::fs::write(&present, VALID_CONFIG).unwrap();
    let config = AppConfig::load(Some(present.as_path())).unwrap();
    assert_eq!(config.speedtest.servers[0].name, "local");
}
