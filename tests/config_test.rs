//! Integration tests for configuration loading

use std::io::Write;
use storenode_metrics::infra::Config;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[node]
id = "node-7"

[metrics]
interval_secs = 5
extended_period_secs = 3600
exporter_port = 9700
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.node_id(), "node-7");
    assert_eq!(config.metrics_interval_secs(), 5);
    assert_eq!(config.extended_period_secs(), 3600);
    assert_eq!(config.exporter_port(), 9700);
}

#[test]
fn test_load_config_with_string_period() {
    let mut temp_file = NamedTempFile::new().unwrap();

    // Extended period as a numeric string, the way an untyped property
    // store would hand it over
    let config_content = r#"
[metrics]
extended_period_secs = "7200"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.extended_period_secs(), 7200);
}

#[test]
fn test_unparsable_period_disables_extended_resets() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[metrics]
interval_secs = 15
extended_period_secs = "one hour"
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    // Load succeeds; only the bad field degrades to disabled
    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.extended_period_secs(), 0);
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.node_id(), "storenode");
    assert_eq!(config.metrics_interval_secs(), 10);
    assert_eq!(config.extended_period_secs(), 0);
}

#[test]
fn test_missing_sections_use_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[node]\nid = \"bare\"\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.node_id(), "bare");
    assert_eq!(config.metrics_interval_secs(), 10);
    assert_eq!(config.exporter_port(), 9600);
}
