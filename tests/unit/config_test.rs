//! Unit tests for configuration loading and saving.

use rustload::metrics::analytics::DurationBuckets;
use rustload::storage::config::{load_config, save_config, AnalyticsConfig, ConfigError};
use tempfile::TempDir;

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AnalyticsConfig::default();
    config.durations = DurationBuckets::new(&[30, 300, 1200, 3600]).unwrap();
    config.critical_power.residual_tolerance = 0.08;
    config.threshold.cp_max_age_days = 45;

    save_config(&config, &path).unwrap();
    let loaded = load_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let loaded = load_config(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(loaded, AnalyticsConfig::default());
}

#[test]
fn test_bad_files_are_reported() {
    let dir = TempDir::new().unwrap();

    let garbled = dir.path().join("garbled.toml");
    std::fs::write(&garbled, "durations = [5, 60").unwrap();
    assert!(matches!(load_config(&garbled), Err(ConfigError::ParseError(_))));

    let out_of_range = dir.path().join("range.toml");
    std::fs::write(
        &out_of_range,
        "[critical_power]\nmin_duration_secs = 1200\nmax_duration_secs = 600\n",
    )
    .unwrap();
    assert!(matches!(
        load_config(&out_of_range),
        Err(ConfigError::InvalidValue(_))
    ));
}

#[test]
fn test_settings_build_components() {
    let config: AnalyticsConfig = toml::from_str(
        r#"
[critical_power]
min_duration_secs = 180
max_duration_secs = 900

[threshold]
mmp_window_days = 60
"#,
    )
    .unwrap();

    assert_eq!(config.critical_power.estimator().duration_range(), (180, 900));
    assert_eq!(config.threshold.resolver().mmp_window_days(), 60);
}
